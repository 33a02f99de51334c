use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::server::state::SinkState;

/// Stores the body as JSON when it parses, hex-encoded otherwise.
pub async fn ingest_traces(State(state): State<Arc<SinkState>>, body: Bytes) -> impl IntoResponse {
    let record = match serde_json::from_slice::<Value>(&body) {
        Ok(value) => value,
        Err(_) => {
            tracing::debug!("Trace body is not JSON; storing {} bytes as hex", body.len());
            json!({ "raw_hex": hex::encode(&body) })
        }
    };
    let total = state.append_trace(record).await;
    tracing::info!("Received trace batch ({} stored)", total);

    Json(json!({ "status": "success" }))
}

pub async fn list_traces(State(state): State<Arc<SinkState>>) -> impl IntoResponse {
    Json(state.traces().await)
}
