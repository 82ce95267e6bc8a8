pub mod handlers;
pub mod middleware;
pub mod state;

use std::future::Future;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

use state::AppState;

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Auth routes
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))

        // Public board
        .route("/display", get(handlers::display::board))
        .route("/display/stream", get(handlers::display::stream_board))
        .route("/public/:collection", get(handlers::display::public_list))

        // Admin console
        .nest("/admin", admin_routes(app_state.clone()))

        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/content/:collection", get(handlers::admin::list_content))
        .route("/content/:collection/:id", delete(handlers::admin::delete_content))
        .route("/stream", get(handlers::admin::stream_content))
        .route("/editor", get(handlers::editor::current))
        .route("/editor/submit", post(handlers::editor::submit))
        .route("/editor/edit/:collection/:id", post(handlers::editor::begin_edit))
        .route("/editor/cancel", post(handlers::editor::cancel_edit))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

/// Serves `app` until `signal` resolves, then flips `shutdown` so streams and
/// background tasks wind down while open connections drain.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: watch::Sender<bool>,
    signal: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("Shutting down");
            shutdown.send_replace(true);
        })
        .await
}
