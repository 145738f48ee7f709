//! Transport encoding for block payloads.
//!
//! A payload travels as the lowercase hex of its canonical JSON text. Going through
//! [`serde_json::Value`] first sorts object keys, so equal payloads always produce
//! the same body (and therefore the same block hash).

use crate::error::{ChainError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Encode any serializable payload as `hex(utf8(canonical_json))`.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
    let value = serde_json::to_value(payload)
        .map_err(|e| ChainError::EncodeError(format!("payload is not JSON-serializable: {}", e)))?;
    let text = serde_json::to_string(&value)
        .map_err(|e| ChainError::EncodeError(format!("failed to serialize payload: {}", e)))?;
    Ok(hex::encode(text.as_bytes()))
}

/// Decode a body produced by [`encode`] back into a JSON value.
pub fn decode(body: &str) -> Result<Value> {
    let bytes = hex::decode(body)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ChainError::DecodeError(format!("body is not UTF-8: {}", e)))?;
    Ok(serde_json::from_str(&text)?)
}

/// Decode a body straight into a typed payload.
pub fn decode_as<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value = decode(body)?;
    Ok(serde_json::from_value(value)?)
}
