use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    /// Credentials are checked before anything touches the network.
    #[error("OpenAI API key is not set in environment variables")]
    MissingApiKey,

    #[error("Failed to initialize vector index: {0}")]
    Index(#[source] anyhow::Error),

    #[error("{0}")]
    Rag(#[source] anyhow::Error),

    #[error("Failed to initialize feedback client: {0}")]
    Feedback(#[source] anyhow::Error),

    #[error("Failed to initialize tracing exporter: {0}")]
    Telemetry(#[source] anyhow::Error),
}
