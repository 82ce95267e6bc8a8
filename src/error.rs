use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A create, update or delete rejected by the store. The message is shown
    /// to the editor as-is.
    #[error("{0}")]
    Write(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("External service error: {0}")]
    External(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.as_str()),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Validation(ref msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.as_str()),
            AppError::Write(ref msg) => {
                tracing::error!("Write failed: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.as_str())
            }
            AppError::Subscription(ref msg) => {
                tracing::error!("Subscription error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.as_str())
            }
            AppError::External(ref msg) => {
                tracing::error!("External service error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.as_str())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::External(err.to_string())
    }
}

/// Failures of an editor form action. Nothing is written for any of the
/// form-level variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Please fill out all fields.")]
    MissingFields(Vec<String>),

    #[error("Invalid {field}: {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("End date must be later than start date.")]
    EndNotAfterStart,

    #[error("Content type cannot be changed while editing.")]
    CollectionLocked {
        editing: crate::domain::Collection,
        requested: crate::domain::Collection,
    },

    #[error("A save is already in progress.")]
    SaveInProgress,

    /// The store rejected the write; carries the underlying cause.
    #[error("Error: {0}")]
    Write(String),
}

impl EditorError {
    /// Form fields the error points at.
    pub fn fields(&self) -> Vec<String> {
        match self {
            EditorError::MissingFields(fields) => fields.clone(),
            EditorError::InvalidDate { field, .. } => vec![field.to_string()],
            EditorError::EndNotAfterStart => vec!["end_date".to_string()],
            EditorError::CollectionLocked { .. } => vec!["collection".to_string()],
            EditorError::SaveInProgress | EditorError::Write(_) => Vec::new(),
        }
    }
}

impl From<EditorError> for AppError {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::SaveInProgress => AppError::Conflict(err.to_string()),
            EditorError::Write(_) => AppError::Write(err.to_string()),
            _ => AppError::Validation(err.to_string()),
        }
    }
}

impl IntoResponse for EditorError {
    fn into_response(self) -> Response {
        let status = match self {
            EditorError::SaveInProgress => StatusCode::CONFLICT,
            EditorError::Write(ref cause) => {
                tracing::error!("Editor write failed: {}", cause);
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "fields": self.fields(),
        }));

        (status, body).into_response()
    }
}
