use axum::extract::OriginalUri;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

pub const SINK_ENDPOINTS: &[&str] = &[
    "GET /health",
    "POST /v1/traces",
    "POST /v1/span_annotations",
    "GET /traces",
    "GET /feedback",
];

pub const MONITOR_ENDPOINTS: &[&str] = &["GET /", "GET /health", "GET /traces", "GET /feedback"];

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

pub async fn sink_not_found(uri: OriginalUri) -> impl IntoResponse {
    not_found(uri, SINK_ENDPOINTS)
}

pub async fn monitor_not_found(uri: OriginalUri) -> impl IntoResponse {
    not_found(uri, MONITOR_ENDPOINTS)
}

fn not_found(OriginalUri(uri): OriginalUri, endpoints: &[&str]) -> impl IntoResponse {
    tracing::debug!("No route for {}", uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "path": uri.path(),
            "valid_endpoints": endpoints,
        })),
    )
}
