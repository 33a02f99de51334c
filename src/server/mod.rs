pub mod handlers;
pub mod router;
pub mod state;

use std::env;

pub use router::{monitor_router, sink_router};
pub use state::{MonitorState, SinkState};

/// Port from the `PORT` environment variable, if set and valid.
pub fn port_override() -> Option<u16> {
    env::var("PORT")
        .ok()
        .and_then(|val| val.trim().parse::<u16>().ok())
}

pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
