//! Signal parsing.
//!
//! Signals are the client-held reactive state, sent by the Datastar client
//! as a JSON object: in the `datastar` query parameter for GET requests,
//! and as the request body for every other method.
//!
//! Malformed client input is expected, so parsing never panics; failures
//! are returned as [`SignalParseError`] values.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::consts::DATASTAR_QUERY_PARAM;
use crate::session::BoxError;

/// Client signals: a JSON object keyed by signal name.
pub type Signals = serde_json::Map<String, Value>;

/// Errors that can occur while reading signals from a request.
#[derive(Debug, Error)]
pub enum SignalParseError {
    /// GET request without a `datastar` query parameter.
    #[error("no `datastar` query parameter in request")]
    MissingQueryParam,

    /// Request body is empty.
    #[error("request body is empty")]
    EmptyBody,

    /// Input is not valid JSON, or does not match the requested type.
    #[error("failed to parse signals: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Input is valid JSON but not an object.
    #[error("signals must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),
}

/// Parse JSON text into signals, rejecting anything but an object.
pub fn parse_signals(json: &str) -> Result<Signals, SignalParseError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(signals) => Ok(signals),
        other => Err(SignalParseError::NotAnObject(json_kind(&other))),
    }
}

/// Parse signals from a raw request body.
pub fn body_signals(body: &[u8]) -> Result<Signals, SignalParseError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(SignalParseError::EmptyBody);
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(signals) => Ok(signals),
        other => Err(SignalParseError::NotAnObject(json_kind(&other))),
    }
}

/// Parse signals from the `datastar` parameter of a query string.
///
/// `query` is the part of the request target after `?`, still
/// percent-encoded.
pub fn query_signals(query: Option<&str>) -> Result<Signals, SignalParseError> {
    let query = query.unwrap_or_default();
    let raw = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == DATASTAR_QUERY_PARAM)
        .map(|(_, value)| value)
        .ok_or(SignalParseError::MissingQueryParam)?;
    parse_signals(&raw)
}

/// Deserialize parsed signals into a caller-defined type.
pub fn signals_into<T: DeserializeOwned>(signals: Signals) -> Result<T, SignalParseError> {
    serde_json::from_value(Value::Object(signals)).map_err(SignalParseError::from)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
