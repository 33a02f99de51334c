use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::server::state::SinkState;

/// Accepts `{"data": [...]}` batches, appending each element, or a single
/// annotation object appended whole. Query parameters are ignored.
pub async fn ingest_annotations(
    State(state): State<Arc<SinkState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    let records = split_annotations(payload)?;
    let received = records.len();
    let total = state.append_feedback(records).await;
    tracing::info!("Received {} feedback annotations ({} stored)", received, total);

    Ok(Json(json!({ "status": "success" })))
}

pub async fn list_feedback(State(state): State<Arc<SinkState>>) -> impl IntoResponse {
    Json(state.feedback().await)
}

fn split_annotations(payload: Value) -> Result<Vec<Value>, ApiError> {
    let Value::Object(mut map) = payload else {
        return Err(ApiError::BadRequest(
            "Annotation body must be a JSON object".to_string(),
        ));
    };
    match map.remove("data") {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => {
            map.insert("data".to_string(), other);
            Ok(vec![Value::Object(map)])
        }
        None => Ok(vec![Value::Object(map)]),
    }
}
