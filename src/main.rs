use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::BufReader;

use wikichat::chat::{repl, ChatInterface};
use wikichat::core::config::defaults::API_KEY_ENV;
use wikichat::core::config::{AppPaths, ConfigService};
use wikichat::core::logging::{self, LogTarget};
use wikichat::state::error::InitializationError;
use wikichat::state::{load_settings, AppState};
use wikichat::telemetry::Telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());

    // The span layer is part of the subscriber, so settings come first.
    let settings = load_settings(&ConfigService::new(paths.clone()))?;
    let telemetry =
        Telemetry::from_config(&settings).map_err(|e| InitializationError::Telemetry(e.into()))?;
    logging::init(&paths, "wikichat.log", LogTarget::FileOnly, telemetry.as_ref())?;
    tracing::info!(
        "Loaded configuration for topic '{}' (telemetry {})",
        settings.corpus.topic,
        if telemetry.is_some() { "on" } else { "off" }
    );

    println!("Initializing the knowledge base, this can take a minute on first start...");
    let state = match AppState::initialize(&paths, &settings).await {
        Ok(state) => state,
        Err(InitializationError::MissingApiKey) => {
            tracing::error!("{} is not set", API_KEY_ENV);
            eprintln!(
                "Error: OpenAI API key is not set. Set {} in your environment and restart.",
                API_KEY_ENV
            );
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            eprintln!("See logs in {}", paths.log_dir.display());
            return Err(err).context("Failed to start the chatbot");
        }
    };

    let mut chat = ChatInterface::new(state.pipeline, state.annotations);
    repl::run(&mut chat, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("Terminal I/O failed")?;

    if let Some(telemetry) = telemetry {
        telemetry.shutdown(Duration::from_secs(5)).await;
    }
    Ok(())
}
