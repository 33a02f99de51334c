use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;

use wikichat::chat::{ChatInterface, QUERY_SPAN_NAME};
use wikichat::core::config::{AppConfig, ServerConfig};
use wikichat::corpus::StaticSource;
use wikichat::feedback::{AnnotationClient, DeliveryOutcome, Rating};
use wikichat::llm::{ChatRequest, LlmProvider};
use wikichat::rag::{RagError, RagPipeline, SqliteVectorIndex};
use wikichat::server::{sink_router, SinkState};
use wikichat::telemetry::Telemetry;

struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, RagError> {
        Ok("Rome was founded in 753 BC.".to_string())
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(inputs.iter().map(|text| vec![text.len() as f32, 1.0]).collect())
    }
}

async fn spawn_sink() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = sink_router(Arc::new(SinkState::new()), &ServerConfig::default());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn pipeline(dir: &tempfile::TempDir) -> Arc<RagPipeline> {
    let index = SqliteVectorIndex::open(dir.path().join("index.db")).await.unwrap();
    let pipeline = RagPipeline::new(
        &AppConfig::default(),
        Arc::new(StaticSource::from_texts(["Rome was founded in 753 BC."])),
        Arc::new(EchoProvider),
        Arc::new(index),
    )
    .unwrap();
    pipeline.build().await.unwrap();
    Arc::new(pipeline)
}

async fn fetch(url: String) -> Vec<Value> {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rating_reaches_the_sink_with_the_answer_span() {
    let dir = tempfile::tempdir().unwrap();
    let sink = spawn_sink().await;

    let mut config = AppConfig::default();
    config.telemetry.endpoint = Some(sink.clone());
    config.telemetry.batch_size = 1;
    let telemetry = Telemetry::from_config(&config).unwrap().unwrap();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(telemetry.layer()));
    let annotations = AnnotationClient::new(&sink, Duration::from_secs(5), false).unwrap();

    let mut chat = ChatInterface::new(pipeline(&dir).await, annotations);
    chat.ask("When was Rome founded?").await;
    let span_id = chat.session().turns()[1].span_id.clone().unwrap();

    let receipt = chat.rate(1, Rating::Negative).await.unwrap();
    assert_eq!(receipt.delivery, DeliveryOutcome::Delivered);

    let feedback = fetch(format!("{}/feedback", sink)).await;
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0]["span_id"], span_id.as_str());
    assert_eq!(feedback[0]["result"]["label"], "thumbs_down");
    assert_eq!(feedback[0]["result"]["score"], 0.0);

    telemetry.shutdown(Duration::from_secs(10)).await;

    // OTLP protobuf is not JSON, so the sink keeps it hex-encoded.
    let traces = fetch(format!("{}/traces", sink)).await;
    let name_hex = hex::encode(QUERY_SPAN_NAME);
    assert!(traces.iter().any(|batch| {
        batch["raw_hex"]
            .as_str()
            .is_some_and(|raw| raw.contains(span_id.as_str()) && raw.contains(&name_hex))
    }));
}

#[tokio::test]
async fn without_tracing_feedback_stays_local() {
    let dir = tempfile::tempdir().unwrap();
    let sink = spawn_sink().await;
    let annotations = AnnotationClient::new(&sink, Duration::from_secs(5), false).unwrap();

    let mut chat = ChatInterface::new(pipeline(&dir).await, annotations);
    chat.ask("When was Rome founded?").await;
    assert_eq!(chat.session().turns()[1].span_id, None);

    let receipt = chat.rate(1, Rating::Positive).await.unwrap();
    assert_eq!(receipt.delivery, DeliveryOutcome::Skipped);
    assert_eq!(chat.session().feedback_store().len(), 1);
    assert!(fetch(format!("{}/feedback", sink)).await.is_empty());
}
