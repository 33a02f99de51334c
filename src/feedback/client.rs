use std::fmt;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use super::FeedbackAnnotation;
use crate::core::config::FeedbackConfig;

/// What happened to one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// No span id, so nothing was sent.
    Skipped,
    Delivered,
    Rejected { status: u16, body: String },
    /// Timeout or connection failure.
    Unreachable(String),
}

impl DeliveryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DeliveryOutcome::Rejected { .. } | DeliveryOutcome::Unreachable(_)
        )
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Skipped => write!(f, "skipped (no span id)"),
            DeliveryOutcome::Delivered => write!(f, "delivered"),
            DeliveryOutcome::Rejected { status, body } => {
                write!(f, "rejected with status {}: {}", status, body)
            }
            DeliveryOutcome::Unreachable(reason) => write!(f, "sink unreachable: {}", reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Failed to create feedback client: {0}")]
    Client(String),

    #[error("Feedback delivery failed: {0}")]
    Delivery(DeliveryOutcome),
}

#[derive(Clone)]
pub struct AnnotationClient {
    client: Client,
    url: String,
    best_effort: bool,
}

impl AnnotationClient {
    pub fn new(endpoint: &str, timeout: Duration, best_effort: bool) -> Result<Self, FeedbackError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedbackError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: format!(
                "{}/v1/span_annotations?sync=false",
                endpoint.trim_end_matches('/')
            ),
            best_effort,
        })
    }

    pub fn from_config(config: &FeedbackConfig) -> Result<Self, FeedbackError> {
        Self::new(
            &config.endpoint,
            Duration::from_secs(config.timeout_secs),
            config.best_effort,
        )
    }

    /// Sends one annotation.
    ///
    /// In best-effort mode every outcome is `Ok`; otherwise rejected and
    /// unreachable deliveries come back as [`FeedbackError::Delivery`].
    pub async fn send(&self, annotation: &FeedbackAnnotation) -> Result<DeliveryOutcome, FeedbackError> {
        let outcome = self.deliver(annotation).await;

        match &outcome {
            DeliveryOutcome::Skipped => {
                tracing::warn!("Skipping feedback annotation: no valid span id available");
            }
            DeliveryOutcome::Delivered => {
                tracing::info!("Sent feedback '{}' to trace sink", annotation.label);
            }
            DeliveryOutcome::Rejected { status, body } => {
                tracing::warn!("Trace sink returned status {}: {}", status, body);
            }
            DeliveryOutcome::Unreachable(reason) => {
                tracing::warn!("Could not connect to trace sink: {}", reason);
            }
        }

        if outcome.is_failure() && !self.best_effort {
            return Err(FeedbackError::Delivery(outcome));
        }
        Ok(outcome)
    }

    async fn deliver(&self, annotation: &FeedbackAnnotation) -> DeliveryOutcome {
        let Some(payload) = annotation.payload() else {
            return DeliveryOutcome::Skipped;
        };

        let res = match self.client.post(&self.url).json(&payload).send().await {
            Ok(res) => res,
            Err(err) => return DeliveryOutcome::Unreachable(err.to_string()),
        };

        let status = res.status();
        if status == reqwest::StatusCode::OK {
            return DeliveryOutcome::Delivered;
        }
        let body = res.text().await.unwrap_or_default();
        DeliveryOutcome::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}
