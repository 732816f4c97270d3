// Codec for the `state` parameter that carries the post-login return path
use base64::{engine::general_purpose, Engine as _};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal some clients send when they had no state to round-trip
const NULL_STATE: &str = "null";

/// Contents of a decoded `state` parameter. Ephemeral; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_pathname: Option<String>,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("state is not a valid JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the `state` query parameter.
///
/// Absent, empty and `"null"` states decode to an empty [`DecodedState`].
///
/// # Errors
///
/// Returns an error if the state is present but is not base64-encoded JSON
/// describing an object.
pub fn decode_state(raw: Option<&str>) -> Result<DecodedState, StateError> {
    let Some(raw) = raw.filter(|s| !s.is_empty() && *s != NULL_STATE) else {
        return Ok(DecodedState::default());
    };

    debug!("Decoding state parameter ({} characters)", raw.len());

    let bytes = decode_base64(raw)?;
    let json = bytes_to_text(bytes);
    let state: DecodedState = serde_json::from_str(&json)?;

    Ok(state)
}

/// Encode a return path into a `state` parameter understood by [`decode_state`]
#[must_use]
pub fn encode_state(return_pathname: &str) -> String {
    let state = DecodedState {
        return_pathname: Some(return_pathname.to_string()),
    };
    // A struct of one string field always serializes
    let json = serde_json::to_string(&state).unwrap_or_default();
    general_purpose::STANDARD.encode(json)
}

/// Standard alphabet first (what browsers' `btoa` emits), with or without
/// padding, then the URL-safe alphabet.
fn decode_base64(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = raw.trim_end_matches('=');
    general_purpose::STANDARD_NO_PAD
        .decode(trimmed)
        .or_else(|_| general_purpose::URL_SAFE_NO_PAD.decode(trimmed))
}

/// UTF-8 when valid, otherwise one Latin-1 character per byte as `atob` does
fn bytes_to_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| e.as_bytes().iter().map(|&b| char::from(b)).collect())
}
