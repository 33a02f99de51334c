use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::core::config::ServerConfig;
use crate::core::errors::ApiError;

/// Append-only in-memory lists behind the sink endpoints.
///
/// Records are self-contained, so concurrent writers may interleave freely.
/// Nothing survives a restart.
#[derive(Default)]
pub struct SinkState {
    traces: RwLock<Vec<Value>>,
    feedback: RwLock<Vec<Value>>,
}

impl SinkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append_trace(&self, record: Value) -> usize {
        let mut traces = self.traces.write().await;
        traces.push(record);
        traces.len()
    }

    pub async fn append_feedback<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let mut feedback = self.feedback.write().await;
        feedback.extend(records);
        feedback.len()
    }

    pub async fn traces(&self) -> Vec<Value> {
        self.traces.read().await.clone()
    }

    pub async fn feedback(&self) -> Vec<Value> {
        self.feedback.read().await.clone()
    }
}

/// The monitor only holds a client pointed at the sink.
pub struct MonitorState {
    pub client: Client,
    pub backend_url: String,
}

impl MonitorState {
    pub fn new(backend_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            client,
            backend_url: backend_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ApiError> {
        Self::new(
            &config.backend_url,
            Duration::from_secs(config.upstream_timeout_secs),
        )
    }

    pub fn backend(&self, path: &str) -> String {
        format!("{}{}", self.backend_url, path)
    }
}
