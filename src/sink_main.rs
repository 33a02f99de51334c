use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use wikichat::core::config::{AppPaths, ConfigService};
use wikichat::core::logging::{self, LogTarget};
use wikichat::server::{self, SinkState};
use wikichat::state::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "trace-sink.log", LogTarget::FileAndStdout, None)?;

    let settings = load_settings(&ConfigService::new(paths))?;
    let port = server::port_override().unwrap_or(settings.server.sink_port);
    let bind_addr = format!("{}:{}", settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Trace sink listening on {}", listener.local_addr()?);

    let app = server::sink_router(Arc::new(SinkState::new()), &settings.server);
    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
