use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::corpus::WikipediaSource;
use crate::feedback::AnnotationClient;
use crate::llm::OpenAiProvider;
use crate::rag::{RagError, RagPipeline, SqliteVectorIndex};

pub mod error;

use error::InitializationError;

/// Everything the chat loop needs, assembled once at startup.
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub annotations: AnnotationClient,
}

impl AppState {
    /// Initializes the chat application.
    ///
    /// This process includes:
    /// 1. Checking the API key
    /// 2. Opening the persisted vector index
    /// 3. Building (or reusing) the index from the Wikipedia corpus
    /// 4. Setting up feedback delivery
    pub async fn initialize(
        paths: &AppPaths,
        settings: &AppConfig,
    ) -> Result<Self, InitializationError> {
        let provider = OpenAiProvider::from_config(&settings.llm).map_err(|e| match e {
            RagError::MissingApiKey => InitializationError::MissingApiKey,
            other => InitializationError::Rag(other.into()),
        })?;

        let index = SqliteVectorIndex::open(&paths.index_path)
            .await
            .map_err(|e| InitializationError::Index(e.into()))?;
        tracing::info!("Vector index at {}", index.db_path().display());

        let source = WikipediaSource::new(&settings.corpus)
            .map_err(|e| InitializationError::Rag(e.into()))?;

        let pipeline = RagPipeline::new(
            settings,
            Arc::new(source),
            Arc::new(provider),
            Arc::new(index),
        )
        .map_err(|e| InitializationError::Rag(e.into()))?;
        pipeline
            .build()
            .await
            .map_err(|e| InitializationError::Rag(e.into()))?;

        let annotations = AnnotationClient::from_config(&settings.feedback)
            .map_err(|e| InitializationError::Feedback(e.into()))?;

        Ok(AppState {
            pipeline: Arc::new(pipeline),
            annotations,
        })
    }
}

/// Loads the merged configuration and validates it into typed settings.
pub fn load_settings(config: &ConfigService) -> Result<AppConfig, InitializationError> {
    config
        .load_app_config()
        .map_err(|e| InitializationError::Config(e.into()))
}
