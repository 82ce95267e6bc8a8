use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::{handlers::admin::parse_collection, middleware::auth::CurrentAdmin, state::AppState},
    error::{AppError, EditorError, Result},
    service::editor::{ContentForm, EditMode, Submission, EDITING_MESSAGE},
};

#[derive(Debug, Serialize)]
pub struct EditorState {
    pub mode: EditMode,
    pub form: ContentForm,
    pub message: Option<&'static str>,
}

pub async fn current(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAdmin>,
) -> Json<EditMode> {
    Json(state.service_context.editor_sessions.mode(&current.session_id))
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAdmin>,
    Json(form): Json<ContentForm>,
) -> std::result::Result<Json<Submission>, EditorError> {
    let ctx = &state.service_context;
    let submission = ctx.editor_sessions
        .submit(&current.session_id, &ctx.editor, &form)
        .await?;

    tracing::info!(
        admin = %current.admin.email,
        id = %submission.record().id,
        "{}",
        submission.message
    );

    Ok(Json(submission))
}

pub async fn begin_edit(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAdmin>,
    Path((collection, id)): Path<(String, Uuid)>,
) -> Result<Json<EditorState>> {
    let collection = parse_collection(&collection)?;
    let ctx = &state.service_context;

    let record = ctx.content_store
        .find(collection, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No {} with id {}", collection.singular(), id)))?;

    let mode = ctx.editor_sessions.mode(&current.session_id);
    let (mode, form) = mode.begin_edit(&record, ctx.editor.offset());
    ctx.editor_sessions.set_mode(&current.session_id, mode);

    Ok(Json(EditorState {
        mode,
        form,
        message: Some(EDITING_MESSAGE),
    }))
}

pub async fn cancel_edit(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAdmin>,
) -> Json<EditorState> {
    let sessions = &state.service_context.editor_sessions;
    let (mode, form) = sessions.mode(&current.session_id).cancel_edit();
    sessions.set_mode(&current.session_id, mode);

    Json(EditorState {
        mode,
        form,
        message: None,
    })
}
