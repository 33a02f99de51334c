use thiserror::Error;

/// Errors raised while building or querying the answer pipeline.
///
/// Inner failures are flattened into the message so the caller sees one
/// wrapped error with the cause appended.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("OpenAI API key is not set in environment variables")]
    MissingApiKey,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("Failed to initialize RAG system: {0}")]
    Build(String),

    #[error("RAG system is not ready: the vector index has not been built")]
    NotReady,

    #[error("Error getting response: {0}")]
    Query(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("vector index error: {0}")]
    Store(String),

    #[error("document source error: {0}")]
    Source(String),
}

impl RagError {
    pub fn build<E: std::fmt::Display>(err: E) -> Self {
        RagError::Build(err.to_string())
    }

    pub fn query<E: std::fmt::Display>(err: E) -> Self {
        RagError::Query(err.to_string())
    }

    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        RagError::Provider(err.to_string())
    }

    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        RagError::Store(err.to_string())
    }

    pub fn source<E: std::fmt::Display>(err: E) -> Self {
        RagError::Source(err.to_string())
    }
}
