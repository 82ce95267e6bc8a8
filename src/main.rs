use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bulletin::{
    api::{self, state::AppState},
    config::Settings,
    service::{
        display::{run_display, BoardView},
        weather::{run_weather, WeatherClient, UNAVAILABLE},
        ServiceContext,
    },
    store::SnapshotSource,
};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bulletin=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting bulletin board on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let service_context = Arc::new(ServiceContext::new(db_pool.clone(), &settings));
    service_context.content_store.reload_all().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (board_tx, board_rx) = watch::channel(BoardView::loading(Utc::now()));
    let (weather_tx, weather_rx) = watch::channel(UNAVAILABLE.to_string());

    let source: Arc<dyn SnapshotSource> = service_context.content_store.clone();
    let display_task = tokio::spawn(run_display(
        source,
        settings.display.clone(),
        board_tx,
        shutdown_rx.clone(),
    ));

    let weather_client = WeatherClient::from_config(&settings.weather)?;
    let weather_task = tokio::spawn(run_weather(
        weather_client,
        settings.weather.poll_interval(),
        weather_tx,
        shutdown_rx.clone(),
    ));

    let cleanup_context = service_context.clone();
    let mut cleanup_shutdown = shutdown_rx.clone();
    let cleanup_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => match cleanup_context.cleanup_sessions().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "expired sessions removed"),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                },
                _ = cleanup_shutdown.changed() => break,
            }
        }
    });

    let settings = Arc::new(settings);
    let app_state = AppState::new(
        service_context,
        settings.clone(),
        board_rx,
        weather_rx,
        shutdown_rx,
    );
    let app = api::create_app(app_state);

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on {}", settings.server.base_url);

    api::serve(listener, app, shutdown_tx, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await?;

    let _ = tokio::join!(display_task, weather_task, cleanup_task);

    Ok(())
}
