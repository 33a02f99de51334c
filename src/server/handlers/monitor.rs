use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::server::state::MonitorState;

pub async fn status(State(state): State<Arc<MonitorState>>) -> impl IntoResponse {
    match state.client.get(state.backend("/health")).send().await {
        Ok(res) if res.status().is_success() => {
            tracing::info!("Successfully connected to trace sink");
        }
        Ok(res) => {
            tracing::warn!("Trace sink health check failed with status {}", res.status());
        }
        Err(err) => {
            tracing::error!("Failed to connect to trace sink: {}", err);
        }
    }

    Json(json!({
        "status": "running",
        "service": "Trace Monitor",
        "version": env!("CARGO_PKG_VERSION"),
        "backend_url": state.backend_url,
    }))
}

pub async fn proxy_traces(State(state): State<Arc<MonitorState>>) -> Result<impl IntoResponse, ApiError> {
    proxy_get(&state, "/traces", "traces").await
}

pub async fn proxy_feedback(State(state): State<Arc<MonitorState>>) -> Result<impl IntoResponse, ApiError> {
    proxy_get(&state, "/feedback", "feedback").await
}

async fn proxy_get(state: &MonitorState, path: &str, what: &str) -> Result<Json<Value>, ApiError> {
    let res = state
        .client
        .get(state.backend(path))
        .send()
        .await
        .map_err(|err| {
            tracing::error!("Failed to fetch {}: {}", what, err);
            ApiError::ServiceUnavailable
        })?;

    let status = res.status();
    if status != reqwest::StatusCode::OK {
        tracing::error!("Trace sink returned status {}", status);
        return Err(ApiError::Upstream {
            status: StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            message: format!("Failed to fetch {}", what),
        });
    }

    res.json::<Value>().await.map(Json).map_err(|err| {
        tracing::error!("Unexpected error fetching {}: {}", what, err);
        ApiError::internal(err)
    })
}
