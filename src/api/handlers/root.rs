use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Bulletin Board API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Campus bulletin board: announcements and events on a time window",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "display": "/display",
            "display_stream": "/display/stream",
            "public": "/public/{announcements|events}",
            "auth": "/auth/login",
            "admin": "/admin"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
