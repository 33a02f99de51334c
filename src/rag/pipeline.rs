//! One-time index build plus per-question retrieval and generation.
//!
//! `build` fetches the corpus, chunks and embeds it and writes the vector
//! index; afterwards `get_response` answers questions against the frozen
//! corpus. Queries before a successful build fail with `RagError::NotReady`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::chunker::Chunker;
use super::context::{context_sources, format_context};
use super::error::RagError;
use super::prompt::PromptTemplate;
use super::store::{IndexEntry, SearchHit, VectorIndex};
use crate::core::config::{AppConfig, LlmConfig};
use crate::corpus::DocumentSource;
use crate::llm::{ChatRequest, LlmProvider};

const EMBEDDING_MODEL_KEY: &str = "embedding_model";
const FINGERPRINT_KEY: &str = "build_fingerprint";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub topic: String,
    pub max_documents: usize,
    pub max_chars_per_document: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub collection: String,
    pub top_k: usize,
    pub embed_batch_size: usize,
    pub rebuild: bool,
    pub llm: LlmConfig,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            topic: config.corpus.topic.clone(),
            max_documents: config.corpus.max_documents,
            max_chars_per_document: config.corpus.max_chars_per_document,
            chunk_size: config.rag.chunk_size,
            chunk_overlap: config.rag.chunk_overlap,
            collection: config.rag.collection.clone(),
            top_k: config.rag.top_k.max(1),
            embed_batch_size: config.rag.embed_batch_size.max(1),
            rebuild: config.rag.rebuild,
            llm: config.llm.clone(),
        }
    }

    /// Everything that shapes the stored vectors. A collection whose recorded
    /// fingerprint differs was built from another corpus and is rebuilt.
    pub fn fingerprint(&self, source: &str) -> BuildFingerprint {
        BuildFingerprint {
            source: source.to_string(),
            topic: self.topic.clone(),
            max_documents: self.max_documents,
            max_chars_per_document: self.max_chars_per_document,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            embedding_model: self.llm.embedding_model.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFingerprint {
    pub source: String,
    pub topic: String,
    pub max_documents: usize,
    pub max_chars_per_document: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
}

/// Outcome of [`RagPipeline::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    /// True when a complete persisted collection was reused as is.
    pub reused: bool,
}

/// Answer plus the passages it was conditioned on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub context: String,
    pub sources: Vec<String>,
}

pub struct RagPipeline {
    source: Arc<dyn DocumentSource>,
    provider: Arc<dyn LlmProvider>,
    index: Arc<dyn VectorIndex>,
    chunker: Chunker,
    prompt: PromptTemplate,
    settings: PipelineSettings,
    ready: AtomicBool,
}

impl RagPipeline {
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn DocumentSource>,
        provider: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self, RagError> {
        let chunker = Chunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
        Ok(Self {
            source,
            provider,
            index,
            chunker,
            prompt: PromptTemplate::from_persona(&config.persona),
            settings: PipelineSettings::from_config(config),
            ready: AtomicBool::new(false),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Builds (or reuses) the index. Any failure leaves the pipeline unusable.
    pub async fn build(&self) -> Result<BuildReport, RagError> {
        tracing::info!("Initializing RAG components...");
        match self.build_index().await {
            Ok(report) => {
                self.ready.store(true, Ordering::Release);
                tracing::info!(
                    "RAG system initialized successfully ({} documents, {} chunks, reused={})",
                    report.documents,
                    report.chunks,
                    report.reused
                );
                Ok(report)
            }
            Err(err) => {
                tracing::error!("Failed to initialize RAG system: {}", err);
                Err(match err {
                    RagError::MissingApiKey | RagError::Build(_) => err,
                    other => RagError::build(other),
                })
            }
        }
    }

    async fn build_index(&self) -> Result<BuildReport, RagError> {
        let collection = &self.settings.collection;
        let embedding_model = &self.settings.llm.embedding_model;
        let fingerprint = self.settings.fingerprint(self.source.name());

        let existing = self.index.count(collection).await?;
        if existing > 0 && !self.settings.rebuild {
            let recorded = self.recorded_fingerprint().await?;
            if recorded.as_ref() == Some(&fingerprint) {
                tracing::info!(
                    "Reusing persisted collection '{}' ({} entries)",
                    collection,
                    existing
                );
                return Ok(BuildReport {
                    documents: 0,
                    chunks: existing,
                    reused: true,
                });
            }
            tracing::warn!(
                "Collection '{}' was built with {:?}, expected {:?}; rebuilding",
                collection,
                recorded,
                fingerprint
            );
        }
        if existing > 0 {
            let removed = self.index.clear(collection).await?;
            tracing::info!("Cleared {} stale entries from '{}'", removed, collection);
        }

        tracing::info!(
            "Retrieving {} content for '{}'...",
            self.source.name(),
            self.settings.topic
        );
        let documents = self.source.fetch(&self.settings.topic).await?;
        tracing::info!("Retrieved {} documents", documents.len());

        let chunks = self.chunker.split_documents(&documents);
        tracing::info!("Created {} text splits", chunks.len());
        if chunks.is_empty() {
            return Err(RagError::Source(format!(
                "documents for '{}' contained no text",
                self.settings.topic
            )));
        }

        tracing::info!(
            "Embedding {} chunks with {} '{}'",
            chunks.len(),
            self.provider.name(),
            embedding_model
        );
        let mut items = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.settings.embed_batch_size) {
            let inputs: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.provider.embed(&inputs, embedding_model).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Provider(format!(
                    "embedding count mismatch: sent {}, received {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            items.extend(batch.iter().map(IndexEntry::from).zip(vectors));
        }

        tracing::info!("Creating vector store...");
        self.index.insert_batch(collection, items).await?;
        self.index
            .set_metadata(collection, EMBEDDING_MODEL_KEY, embedding_model)
            .await?;
        // Written last: an interrupted build leaves no fingerprint and is redone.
        let encoded = serde_json::to_string(&fingerprint).map_err(RagError::store)?;
        self.index
            .set_metadata(collection, FINGERPRINT_KEY, &encoded)
            .await?;

        Ok(BuildReport {
            documents: documents.len(),
            chunks: chunks.len(),
            reused: false,
        })
    }

    /// A fingerprint that no longer parses counts as absent.
    async fn recorded_fingerprint(&self) -> Result<Option<BuildFingerprint>, RagError> {
        let raw = self
            .index
            .metadata(&self.settings.collection, FINGERPRINT_KEY)
            .await?;
        Ok(raw.and_then(|value| serde_json::from_str(&value).ok()))
    }

    /// Top-k most similar chunks for the question, best first.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchHit>, RagError> {
        if !self.is_ready() {
            return Err(RagError::NotReady);
        }
        let mut vectors = self
            .provider
            .embed(&[question.to_string()], &self.settings.llm.embedding_model)
            .await?;
        let query_embedding = vectors
            .pop()
            .ok_or_else(|| RagError::Provider("no embedding returned for query".to_string()))?;

        self.index
            .search(&self.settings.collection, &query_embedding, self.settings.top_k)
            .await
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, RagError> {
        if !self.is_ready() {
            return Err(RagError::NotReady);
        }
        tracing::info!("Processing question: {}", question);

        match self.answer_inner(question).await {
            Ok(answer) => {
                tracing::info!("Response generated successfully");
                Ok(answer)
            }
            Err(err) => {
                tracing::error!("Error getting response: {}", err);
                Err(RagError::query(err))
            }
        }
    }

    /// The generated answer text, verbatim.
    pub async fn get_response(&self, question: &str) -> Result<String, RagError> {
        self.answer(question).await.map(|answer| answer.text)
    }

    async fn answer_inner(&self, question: &str) -> Result<Answer, RagError> {
        let hits = self.retrieve(question).await?;
        let context = format_context(&hits);
        let sources = context_sources(&hits);
        tracing::debug!("Retrieved {} chunks from {:?}", hits.len(), sources);

        let messages = self.prompt.render(&context, question);
        let request = ChatRequest::new(messages).with_config(&self.settings.llm);
        let text = self
            .provider
            .chat(request, &self.settings.llm.chat_model)
            .await?;

        Ok(Answer {
            text,
            context,
            sources,
        })
    }
}
