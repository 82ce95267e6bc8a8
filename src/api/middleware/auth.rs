use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::SESSION_COOKIE,
    domain::Admin,
    error::AppError,
};

/// The logged-in admin, inserted into request extensions by [`require_auth`].
#[derive(Clone)]
pub struct CurrentAdmin {
    pub admin: Admin,
    /// Server-side session id; keys the editor state for this login.
    pub session_id: String,
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session_cookie = jar
        .get(SESSION_COOKIE)
        .ok_or(AppError::Unauthorized)?;

    let session = state.service_context.auth_service
        .validate_session(session_cookie.value())
        .await?
        .ok_or(AppError::Unauthorized)?;

    let admin = state.service_context.admin_repo
        .find_by_id(session.admin_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(CurrentAdmin {
        admin,
        session_id: session.id,
    });

    Ok(next.run(request).await)
}
