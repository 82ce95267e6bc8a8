use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod admin_repository;
pub mod content_repository;

pub use admin_repository::SqliteAdminRepository;
pub use content_repository::SqliteContentRepository;

/// Persistence for both board collections. Every call addresses exactly one
/// collection and at most one document.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Inserts a new document and returns it with its assigned id.
    async fn create(&self, collection: Collection, payload: ContentPayload) -> Result<ContentRecord>;
    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<ContentRecord>>;
    async fn list(&self, collection: Collection, order: SortOrder) -> Result<Vec<ContentRecord>>;
    /// Documents whose window has opened by `at` (end not checked).
    async fn list_started(
        &self,
        collection: Collection,
        at: DateTime<Utc>,
        order: SortOrder,
    ) -> Result<Vec<ContentRecord>>;
    /// Full overwrite of the editable fields. `created_at` is never touched.
    async fn update(&self, collection: Collection, id: Uuid, payload: ContentPayload) -> Result<ContentRecord>;
    /// Returns whether a document was removed.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn create(&self, request: CreateAdminRequest) -> Result<Admin>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Admin>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Admin>>;
    async fn password_hash(&self, email: &str) -> Result<Option<String>>;
    async fn set_password(&self, id: Uuid, password: &str) -> Result<()>;
}
