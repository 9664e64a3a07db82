use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{error::IngestionError, models::IngestionEvent};

/// Decodes a storage notification delivered as any of:
/// raw object metadata, a structured CloudEvent (`data` holds the metadata),
/// or a Pub/Sub push envelope (`message.data` holds base64 metadata).
pub fn decode_event(body: &[u8]) -> Result<IngestionEvent, IngestionError> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        warn!("Event body is not valid JSON: {}", e);
        IngestionError::InvalidEvent(format!("body is not JSON: {}", e))
    })?;

    let object = unwrap_envelope(payload)?;
    event_from_metadata(&object)
}

fn unwrap_envelope(payload: Value) -> Result<Value, IngestionError> {
    if let Some(data) = payload.get("message").and_then(|m| m.get("data")) {
        debug!("Decoding Pub/Sub push envelope");
        let encoded = data
            .as_str()
            .ok_or_else(|| IngestionError::InvalidEvent("message.data is not a string".to_string()))?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| IngestionError::InvalidEvent(format!("message.data is not base64: {}", e)))?;
        return serde_json::from_slice(&bytes)
            .map_err(|e| IngestionError::InvalidEvent(format!("message.data is not JSON: {}", e)));
    }

    if payload.get("specversion").is_some() {
        debug!("Decoding structured CloudEvent");
        return match payload.get("data") {
            Some(data) if data.is_object() => Ok(data.clone()),
            _ => Err(IngestionError::InvalidEvent("CloudEvent has no data object".to_string())),
        };
    }

    Ok(payload)
}

fn event_from_metadata(object: &Value) -> Result<IngestionEvent, IngestionError> {
    let bucket = required_str(object, "bucket")?;
    let name = required_str(object, "name")?;

    Ok(IngestionEvent {
        bucket,
        name,
        generation: scalar_as_string(object.get("generation")),
        // Storage metadata encodes int64 as a JSON string.
        size: scalar_as_string(object.get("size")).and_then(|s| s.parse().ok()),
        content_type: object
            .get("contentType")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn required_str(object: &Value, key: &str) -> Result<String, IngestionError> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(IngestionError::InvalidEvent(format!(
            "field `{}` must be a string, got {}",
            key, other
        ))),
        None => {
            warn!("Event payload is missing `{}`", key);
            Err(IngestionError::InvalidEvent(format!("missing field `{}`", key)))
        }
    }
}

fn scalar_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
