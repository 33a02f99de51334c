use std::sync::Arc;

use thiserror::Error;
use tracing::Instrument;

use super::session::{ChatSession, SessionError};
use crate::core::config::defaults::APOLOGY_MESSAGE;
use crate::feedback::{AnnotationClient, DeliveryOutcome, FeedbackAnnotation, FeedbackError, Rating};
use crate::rag::RagPipeline;
use crate::telemetry;

pub const QUERY_SPAN_NAME: &str = "RAG Query Processing";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Feedback(#[from] FeedbackError),
}

/// A rating accepted into the session, plus what happened on the wire.
#[derive(Debug, Clone)]
pub struct FeedbackReceipt {
    pub annotation: FeedbackAnnotation,
    pub delivery: DeliveryOutcome,
}

/// Recovery boundary between the user and the answer pipeline.
///
/// Query failures never escape `ask`; they are logged and replaced by a
/// generic apology so the session stays usable.
pub struct ChatInterface {
    pipeline: Arc<RagPipeline>,
    session: ChatSession,
    annotations: AnnotationClient,
}

impl ChatInterface {
    pub fn new(pipeline: Arc<RagPipeline>, annotations: AnnotationClient) -> Self {
        Self {
            pipeline,
            session: ChatSession::new(),
            annotations,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub async fn ask(&mut self, question: &str) -> String {
        self.session.push_user(question);

        let span = tracing::info_span!(
            "rag_query",
            otel.name = QUERY_SPAN_NAME,
            rag.query = %question,
            otel.status_code = tracing::field::Empty,
            otel.status_message = tracing::field::Empty,
        );
        // None unless an OpenTelemetry layer is recording.
        let span_id = telemetry::span_id(&span);

        let response = self
            .pipeline
            .get_response(question)
            .instrument(span.clone())
            .await;
        match response {
            Ok(answer) => {
                span.record("otel.status_code", "OK");
                self.session.push_assistant(answer.clone(), span_id);
                answer
            }
            Err(err) => {
                tracing::error!(parent: &span, "Error getting response: {}", err);
                span.record("otel.status_message", err.to_string().as_str());
                self.session.push_assistant(APOLOGY_MESSAGE, None);
                APOLOGY_MESSAGE.to_string()
            }
        }
    }

    pub async fn rate(&mut self, idx: usize, rating: Rating) -> Result<FeedbackReceipt, ChatError> {
        let annotation = self.session.rate(idx, rating)?;
        self.deliver(annotation).await
    }

    pub async fn submit_feedback(&mut self, idx: usize, text: &str) -> Result<FeedbackReceipt, ChatError> {
        let annotation = self.session.submit_text(idx, text)?;
        self.deliver(annotation).await
    }

    pub fn draft_feedback(&mut self, idx: usize, text: &str) -> Result<(), ChatError> {
        Ok(self.session.draft_text(idx, text)?)
    }

    pub fn clear(&mut self) {
        self.session.clear();
    }

    async fn deliver(&self, annotation: FeedbackAnnotation) -> Result<FeedbackReceipt, ChatError> {
        let delivery = self.annotations.send(&annotation).await?;
        Ok(FeedbackReceipt {
            annotation,
            delivery,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppConfig;
    use crate::corpus::StaticSource;
    use crate::llm::{ChatRequest, LlmProvider};
    use crate::rag::{RagError, SqliteVectorIndex};
    use crate::telemetry::Telemetry;
    use async_trait::async_trait;
    use opentelemetry_sdk::trace::TracerProvider;
    use std::time::Duration;
    use tracing_subscriber::layer::SubscriberExt;

    struct FixedProvider {
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, RagError> {
            if self.fail {
                Err(RagError::Provider("503 Service Unavailable".to_string()))
            } else {
                Ok("In 753 BC.".to_string())
            }
        }

        async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    async fn built_pipeline(dir: &tempfile::TempDir, fail: bool) -> Arc<RagPipeline> {
        let index = SqliteVectorIndex::open(dir.path().join("index.db")).await.unwrap();
        let pipeline = RagPipeline::new(
            &AppConfig::default(),
            Arc::new(StaticSource::from_texts(["Rome was founded in 753 BC."])),
            Arc::new(FixedProvider { fail }),
            Arc::new(index),
        )
        .unwrap();
        pipeline.build().await.unwrap();
        Arc::new(pipeline)
    }

    fn offline_client() -> AnnotationClient {
        AnnotationClient::new("http://127.0.0.1:1", Duration::from_millis(300), true).unwrap()
    }

    /// Span ids are assigned without exporting anything.
    fn recording_telemetry() -> Telemetry {
        Telemetry::with_provider(TracerProvider::builder().build())
    }

    #[tokio::test]
    async fn answers_are_stored_with_span_ids() {
        let dir = tempfile::tempdir().unwrap();
        let telemetry = recording_telemetry();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));
        let mut chat = ChatInterface::new(built_pipeline(&dir, false).await, offline_client());

        let answer = chat.ask("When was Rome founded?").await;
        assert_eq!(answer, "In 753 BC.");
        chat.ask("And who founded it?").await;

        let turns = chat.session().turns();
        assert_eq!(turns.len(), 4);
        let first = turns[1].span_id.clone().unwrap();
        let second = turns[3].span_id.clone().unwrap();
        assert_eq!(first.len(), 16);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn query_failure_becomes_apology_and_session_survives() {
        let dir = tempfile::tempdir().unwrap();
        let mut chat = ChatInterface::new(built_pipeline(&dir, true).await, offline_client());

        assert_eq!(chat.ask("When was Rome founded?").await, APOLOGY_MESSAGE);
        assert_eq!(chat.ask("And the fall?").await, APOLOGY_MESSAGE);
        assert_eq!(chat.session().turns().len(), 4);
        assert_eq!(chat.session().turns()[1].span_id, None);
    }

    #[tokio::test]
    async fn rating_without_span_id_is_kept_locally_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut chat = ChatInterface::new(built_pipeline(&dir, false).await, offline_client());
        chat.ask("When was Rome founded?").await;
        assert_eq!(chat.session().turns()[1].span_id, None);

        let receipt = chat.rate(1, Rating::Positive).await.unwrap();
        assert_eq!(receipt.delivery, DeliveryOutcome::Skipped);
        assert_eq!(receipt.annotation.score, 1.0);
        assert_eq!(chat.session().feedback_store().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_sink_still_accepts_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let telemetry = recording_telemetry();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));
        let mut chat = ChatInterface::new(built_pipeline(&dir, false).await, offline_client());
        chat.ask("When was Rome founded?").await;

        let receipt = chat.submit_feedback(1, "Concise, thanks").await.unwrap();
        assert!(matches!(receipt.delivery, DeliveryOutcome::Unreachable(_)));
        assert_eq!(receipt.annotation.score, 0.5);
        assert_eq!(chat.session().feedback_store().len(), 1);

        chat.clear();
        assert!(chat.session().is_empty());
    }
}
