use std::time::Duration;

use opentelemetry::trace::TraceError;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::trace::{self as sdktrace, BatchSpanProcessor, TracerProvider};
use opentelemetry_sdk::Resource;

use super::SERVICE_NAME;
use crate::core::config::AppConfig;

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Collector base URL; spans go to `<endpoint>/v1/traces`.
    pub endpoint: String,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub timeout: Duration,
}

impl ExporterConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.trace_endpoint().to_string(),
            batch_size: config.telemetry.batch_size.max(1),
            flush_interval: Duration::from_millis(config.telemetry.flush_interval_ms),
            timeout: Duration::from_secs(config.telemetry.timeout_secs),
        }
    }

    pub fn traces_url(&self) -> String {
        format!("{}/v1/traces", self.endpoint.trim_end_matches('/'))
    }
}

/// Provider whose spans are batched and posted as OTLP/HTTP protobuf.
pub fn build_provider(config: &ExporterConfig) -> Result<TracerProvider, TraceError> {
    // The http exporter appends the `/v1/traces` signal path itself.
    let exporter = opentelemetry_otlp::new_exporter()
        .http()
        .with_endpoint(config.endpoint.trim_end_matches('/'))
        .with_timeout(config.timeout)
        .build_span_exporter()?;

    let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
        .with_max_export_batch_size(config.batch_size.max(1))
        .with_scheduled_delay(config.flush_interval)
        .build();

    let resource = Resource::new(vec![KeyValue::new("service.name", SERVICE_NAME)]);
    Ok(TracerProvider::builder()
        .with_span_processor(processor)
        .with_config(sdktrace::config().with_resource(resource))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{span_id, Telemetry};
    use tracing_subscriber::layer::SubscriberExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn exporter_config(endpoint: String, timeout: Duration) -> ExporterConfig {
        ExporterConfig {
            endpoint,
            batch_size: 8,
            flush_interval: Duration::from_secs(60),
            timeout,
        }
    }

    #[test]
    fn traces_url_ignores_trailing_slash() {
        let config = exporter_config("http://localhost:6006/".to_string(), Duration::from_secs(5));
        assert_eq!(config.traces_url(), "http://localhost:6006/v1/traces");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn finished_spans_are_posted_as_otlp_protobuf() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/traces"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = exporter_config(format!("{}/", server.uri()), Duration::from_secs(5));
        let telemetry = Telemetry::with_provider(build_provider(&config).unwrap());
        let subscriber = tracing_subscriber::registry().with(telemetry.layer());

        let exported_id = tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("rag_query", otel.name = "RAG Query Processing");
            span_id(&span)
        })
        .unwrap();
        telemetry.shutdown(Duration::from_secs(10)).await;

        let requests = server.received_requests().await.unwrap();
        assert!(!requests.is_empty());
        let request = &requests[0];
        let content_type = request.headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("protobuf"));
        // span_id is a raw 8-byte field in the protobuf body.
        assert!(hex::encode(&request.body).contains(&exported_id));
        let name = b"RAG Query Processing";
        assert!(request.body.windows(name.len()).any(|window| window == name));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unreachable_collector_does_not_block_shutdown() {
        let config = exporter_config("http://127.0.0.1:1".to_string(), Duration::from_millis(200));
        let telemetry = Telemetry::with_provider(build_provider(&config).unwrap());
        let subscriber = tracing_subscriber::registry().with(telemetry.layer());

        tracing::subscriber::with_default(subscriber, || {
            drop(tracing::info_span!("lost"));
        });
        tokio::time::timeout(
            Duration::from_secs(15),
            telemetry.shutdown(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    }
}
