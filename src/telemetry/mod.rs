//! Answer spans exported over OTLP.
//!
//! Spans are plain `tracing` spans. When telemetry is enabled, a
//! `tracing-opentelemetry` layer turns them into OpenTelemetry spans and a
//! batch processor ships them to `<endpoint>/v1/traces` as OTLP/HTTP
//! protobuf. The id of an answer span is read back from its OpenTelemetry
//! context so that feedback can later be annotated against it.

mod exporter;

use std::time::Duration;

use opentelemetry::trace::{TraceContextExt, TraceError, TracerProvider as _};
use opentelemetry_sdk::trace::{Tracer, TracerProvider};
use tracing::Subscriber;
use tracing_opentelemetry::{OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::registry::LookupSpan;

use crate::core::config::AppConfig;

pub use exporter::{build_provider, ExporterConfig};

pub const SERVICE_NAME: &str = "wikichat";

/// Owns the tracer provider; dropping it without [`Telemetry::shutdown`]
/// may lose spans still queued for export.
pub struct Telemetry {
    provider: TracerProvider,
    tracer: Tracer,
}

impl Telemetry {
    pub fn with_provider(provider: TracerProvider) -> Self {
        let tracer = provider.tracer(SERVICE_NAME);
        Self { provider, tracer }
    }

    /// `None` when telemetry is disabled in the config.
    ///
    /// Must be called from inside a Tokio runtime; the batch task is spawned on it.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, TraceError> {
        if !config.telemetry.enabled {
            tracing::info!("Telemetry disabled; answers will carry no span id");
            return Ok(None);
        }

        let exporter_config = ExporterConfig::from_config(config);
        route_export_errors();
        let provider = build_provider(&exporter_config)?;
        tracing::info!("Exporting spans to {}", exporter_config.traces_url());
        Ok(Some(Self::with_provider(provider)))
    }

    /// Layer that records `tracing` spans as OpenTelemetry spans.
    pub fn layer<S>(&self) -> OpenTelemetryLayer<S, Tracer>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        tracing_opentelemetry::layer().with_tracer(self.tracer.clone())
    }

    /// Flushes queued spans, giving up after `grace`.
    pub async fn shutdown(self, grace: Duration) {
        let provider = self.provider;
        // force_flush blocks until the batch task has exported.
        let flush = tokio::task::spawn_blocking(move || provider.force_flush());

        match tokio::time::timeout(grace, flush).await {
            Ok(Ok(results)) => {
                for result in results {
                    if let Err(err) = result {
                        tracing::warn!("Span flush failed: {}", err);
                    }
                }
            }
            Ok(Err(err)) => tracing::warn!("Span flush task failed: {}", err),
            Err(_) => tracing::warn!("Span exporter did not drain within {:?}", grace),
        }
    }
}

/// The exported id of `span` as 16 lowercase hex chars, or `None` when no
/// OpenTelemetry layer is recording it.
pub fn span_id(span: &tracing::Span) -> Option<String> {
    let context = span.context();
    let otel_span = context.span();
    let span_context = otel_span.span_context();
    span_context
        .is_valid()
        .then(|| span_context.span_id().to_string())
}

/// Export failures surface as log warnings instead of stderr noise in the chat.
fn route_export_errors() {
    let installed = opentelemetry::global::set_error_handler(|err| {
        tracing::warn!("OpenTelemetry error: {}", err);
    });
    if let Err(err) = installed {
        tracing::debug!("Keeping the default OpenTelemetry error handler: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn spans_without_a_layer_have_no_id() {
        let span = tracing::info_span!("unrecorded");
        assert_eq!(span_id(&span), None);
    }

    #[test]
    fn recorded_spans_get_distinct_hex_ids() {
        let telemetry = Telemetry::with_provider(TracerProvider::builder().build());
        let subscriber = tracing_subscriber::registry().with(telemetry.layer());

        let (first, second) = tracing::subscriber::with_default(subscriber, || {
            let first = span_id(&tracing::info_span!("first"));
            let second = span_id(&tracing::info_span!("second"));
            (first, second)
        });

        let first = first.unwrap();
        assert_eq!(first.len(), 16);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(first, "0000000000000000");
        assert_ne!(Some(first), second);
    }

    #[tokio::test]
    async fn disabled_config_builds_nothing() {
        let mut config = AppConfig::default();
        config.telemetry.enabled = false;
        assert!(Telemetry::from_config(&config).unwrap().is_none());
    }
}
