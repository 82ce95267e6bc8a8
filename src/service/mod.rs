pub mod clock;
pub mod display;
pub mod editor;
pub mod weather;

use std::collections::HashSet;
use std::sync::Arc;
use sqlx::SqlitePool;
use crate::auth::AuthService;
use crate::config::Settings;
use crate::error::Result;
use crate::repository::*;
use crate::store::ContentStore;
use editor::{ContentEditor, EditorSessions};

pub struct ServiceContext {
    pub content_store: Arc<ContentStore>,
    pub admin_repo: Arc<dyn AdminRepository>,
    pub auth_service: Arc<AuthService>,
    pub editor: Arc<ContentEditor>,
    pub editor_sessions: Arc<EditorSessions>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings) -> Self {
        let content_repo = Arc::new(SqliteContentRepository::new(db_pool.clone()));
        let admin_repo = Arc::new(SqliteAdminRepository::new(db_pool.clone()));

        let content_store = Arc::new(ContentStore::new(content_repo));
        let auth_service = Arc::new(AuthService::new(
            db_pool.clone(),
            settings.auth.session_duration_hours,
            settings.auth.secure_cookies,
        ));

        let editor = Arc::new(ContentEditor::new(
            content_store.clone(),
            settings.display.offset(),
            settings.editor.confirm_reset(),
        ));

        Self {
            content_store,
            admin_repo,
            auth_service,
            editor,
            editor_sessions: Arc::new(EditorSessions::new()),
            db_pool,
        }
    }

    /// Deletes expired login sessions and forgets their editor state.
    pub async fn cleanup_sessions(&self) -> Result<u64> {
        let removed = self.auth_service.cleanup_expired_sessions().await?;
        let live: HashSet<String> = self.auth_service.active_session_ids().await?.into_iter().collect();
        self.editor_sessions.retain(|session_id| live.contains(session_id));
        Ok(removed)
    }
}
