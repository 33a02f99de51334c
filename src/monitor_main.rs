use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use wikichat::core::config::{AppPaths, ConfigService};
use wikichat::core::logging::{self, LogTarget};
use wikichat::server::{self, MonitorState};
use wikichat::state::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "monitor.log", LogTarget::FileAndStdout, None)?;

    let settings = load_settings(&ConfigService::new(paths))?;
    let state = MonitorState::from_config(&settings.server)
        .context("Failed to create upstream client")?;
    let port = server::port_override().unwrap_or(settings.server.monitor_port);
    let bind_addr = format!("{}:{}", settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!(
        "Monitor listening on {}, proxying {}",
        listener.local_addr()?,
        state.backend_url
    );

    let app = server::monitor_router(Arc::new(state), &settings.server);
    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
