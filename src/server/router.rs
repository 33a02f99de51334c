use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::ServerConfig;
use crate::server::handlers::{annotations, health, monitor, traces};
use crate::server::state::{MonitorState, SinkState};

/// Router for the feedback/trace sink.
///
/// Ingest endpoints append to in-memory lists; the list endpoints dump
/// them whole. Unknown paths, and known paths with the wrong method, get a
/// 404 naming the valid endpoints.
pub fn sink_router(state: Arc<SinkState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health::health).fallback(health::sink_not_found))
        .route(
            "/v1/traces",
            post(traces::ingest_traces).fallback(health::sink_not_found),
        )
        .route(
            "/v1/span_annotations",
            post(annotations::ingest_annotations).fallback(health::sink_not_found),
        )
        .route("/traces", get(traces::list_traces).fallback(health::sink_not_found))
        .route(
            "/feedback",
            get(annotations::list_feedback).fallback(health::sink_not_found),
        )
        .fallback(health::sink_not_found)
        .with_state(state)
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// Router for the read-only monitor in front of the sink.
pub fn monitor_router(state: Arc<MonitorState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(monitor::status).fallback(health::monitor_not_found))
        .route("/health", get(health::health).fallback(health::monitor_not_found))
        .route(
            "/traces",
            get(monitor::proxy_traces).fallback(health::monitor_not_found),
        )
        .route(
            "/feedback",
            get(monitor::proxy_feedback).fallback(health::monitor_not_found),
        )
        .fallback(health::monitor_not_found)
        .with_state(state)
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins = resolve_allowed_origins(config);

    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<_>>(),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(config: &ServerConfig) -> Vec<String> {
    let origins = config
        .cors_allowed_origins
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:6006".to_string(),
        "http://localhost:6008".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:6006".to_string(),
        "http://127.0.0.1:6008".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_origins_fall_back_to_local_defaults() {
        let config = ServerConfig {
            cors_allowed_origins: vec!["  ".to_string()],
            ..ServerConfig::default()
        };
        assert_eq!(resolve_allowed_origins(&config), default_local_origins());

        let config = ServerConfig {
            cors_allowed_origins: vec![" http://example.org ".to_string()],
            ..ServerConfig::default()
        };
        assert_eq!(resolve_allowed_origins(&config), vec!["http://example.org"]);
    }
}
