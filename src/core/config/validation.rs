use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(corpus) = expect_optional_object(root, "corpus")? {
        validate_non_empty_string_field(corpus, "corpus.topic", "topic")?;
        validate_optional_string_field(corpus, "corpus.language", "language")?;
        validate_optional_string_field(corpus, "corpus.base_url", "base_url")?;
        validate_u64_field(corpus, "corpus.max_documents", "max_documents", 1, 100)?;
        validate_u64_field(
            corpus,
            "corpus.max_chars_per_document",
            "max_chars_per_document",
            1,
            10_000_000,
        )?;
        validate_u64_field(corpus, "corpus.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(rag, "rag.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(rag, "rag.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(rag, "rag.embed_batch_size", "embed_batch_size", 1, 2_048)?;
        validate_non_empty_string_field(rag, "rag.collection", "collection")?;
        validate_bool_field(rag, "rag.rebuild", "rebuild")?;
        validate_overlap(rag)?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_non_empty_string_field(llm, "llm.base_url", "base_url")?;
        validate_non_empty_string_field(llm, "llm.chat_model", "chat_model")?;
        validate_non_empty_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(persona) = expect_optional_object(root, "persona")? {
        validate_optional_string_field(persona, "persona.system_template", "system_template")?;
        validate_optional_string_field(persona, "persona.human_template", "human_template")?;
    }

    if let Some(feedback) = expect_optional_object(root, "feedback")? {
        validate_non_empty_string_field(feedback, "feedback.endpoint", "endpoint")?;
        validate_u64_field(feedback, "feedback.timeout_secs", "timeout_secs", 1, 300)?;
        validate_bool_field(feedback, "feedback.best_effort", "best_effort")?;
    }

    if let Some(telemetry) = expect_optional_object(root, "telemetry")? {
        validate_bool_field(telemetry, "telemetry.enabled", "enabled")?;
        validate_optional_string_field(telemetry, "telemetry.endpoint", "endpoint")?;
        validate_u64_field(telemetry, "telemetry.batch_size", "batch_size", 1, 10_000)?;
        validate_u64_field(
            telemetry,
            "telemetry.flush_interval_ms",
            "flush_interval_ms",
            10,
            600_000,
        )?;
        validate_u64_field(telemetry, "telemetry.timeout_secs", "timeout_secs", 1, 300)?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.sink_port", "sink_port", 0, 65535)?;
        validate_u64_field(server, "server.monitor_port", "monitor_port", 0, 65535)?;
        validate_optional_string_field(server, "server.backend_url", "backend_url")?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
        validate_u64_field(
            server,
            "server.upstream_timeout_secs",
            "upstream_timeout_secs",
            1,
            300,
        )?;
    }

    Ok(())
}

/// Overlap must stay strictly below the window, defaults filling either side.
fn validate_overlap(rag: &Map<String, Value>) -> Result<(), ApiError> {
    let size = rag
        .get("chunk_size")
        .and_then(Value::as_u64)
        .unwrap_or(super::defaults::DEFAULT_CHUNK_SIZE as u64);
    let overlap = rag
        .get("chunk_overlap")
        .and_then(Value::as_u64)
        .unwrap_or(super::defaults::DEFAULT_CHUNK_OVERLAP as u64);
    if overlap >= size {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at 'rag.chunk_overlap': {} must be smaller than rag.chunk_size ({})",
            overlap, size
        )));
    }
    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
