use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use crate::{
    config::Settings,
    service::{display::BoardView, ServiceContext},
};

#[derive(Clone)]
pub struct AppState {
    pub service_context: Arc<ServiceContext>,
    pub settings: Arc<Settings>,
    /// Latest public board, kept current by the display task.
    pub board: watch::Receiver<BoardView>,
    /// Latest weather line, kept current by the weather poller.
    pub weather: watch::Receiver<String>,
    /// Flips to true when the server starts shutting down.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        service_context: Arc<ServiceContext>,
        settings: Arc<Settings>,
        board: watch::Receiver<BoardView>,
        weather: watch::Receiver<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            service_context,
            settings,
            board,
            weather,
            shutdown,
        }
    }

    /// Resolves once shutdown starts, or if the signal's sender is gone.
    /// Long-lived responses end on it so graceful shutdown can finish.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut shutdown = self.shutdown.clone();
        async move {
            let _ = shutdown.wait_for(|stopping| *stopping).await;
        }
    }
}
