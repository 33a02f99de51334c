//! Typed view over the merged YAML configuration.
//!
//! Every field has a default so an absent `config.yml` still yields a
//! runnable setup; only the provider API key has no fallback.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults::*;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub corpus: CorpusConfig,
    pub rag: RagConfig,
    pub llm: LlmConfig,
    pub persona: PersonaConfig,
    pub feedback: FeedbackConfig,
    pub telemetry: TelemetryConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ApiError::BadRequest(format!("Invalid configuration: {}", e)))
    }

    /// Sink endpoint that spans are exported to.
    pub fn trace_endpoint(&self) -> &str {
        self.telemetry
            .endpoint
            .as_deref()
            .unwrap_or(&self.feedback.endpoint)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub topic: String,
    pub language: String,
    pub base_url: String,
    pub max_documents: usize,
    pub max_chars_per_document: usize,
    pub timeout_secs: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            language: "en".to_string(),
            base_url: DEFAULT_WIKIPEDIA_URL.to_string(),
            max_documents: 3,
            max_chars_per_document: 4000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub collection: String,
    /// Force a rebuild even when the persisted collection looks complete.
    pub rebuild: bool,
    pub embed_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            collection: DEFAULT_COLLECTION.to_string(),
            rebuild: false,
            embed_batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub system_template: String,
    pub human_template: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            system_template: DEFAULT_SYSTEM_TEMPLATE.to_string(),
            human_template: DEFAULT_HUMAN_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// When false, failed deliveries are reported to the caller as errors.
    pub best_effort: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SINK_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_FEEDBACK_TIMEOUT_SECS,
            best_effort: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            batch_size: 16,
            flush_interval_ms: 2000,
            timeout_secs: DEFAULT_FEEDBACK_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub sink_port: u16,
    pub monitor_port: u16,
    /// Sink the monitor proxies to.
    pub backend_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub upstream_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            sink_port: DEFAULT_SINK_PORT,
            monitor_port: DEFAULT_MONITOR_PORT,
            backend_url: DEFAULT_SINK_ENDPOINT.to_string(),
            cors_allowed_origins: vec!["*".to_string()],
            upstream_timeout_secs: DEFAULT_FEEDBACK_TIMEOUT_SECS,
        }
    }
}
