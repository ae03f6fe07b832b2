//! Response classification
//!
//! Maps a gateway response (status, content type, body) onto an [`Outcome`].
//! Classification is pure; the client applies the side effects (clearing the
//! session on 401).

use reqwest::StatusCode;
use serde_json::Value;

/// Successful response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Empty,
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// JSON value, text as a JSON string, empty as null
    pub fn to_value(&self) -> Value {
        match self {
            Self::Json(v) => v.clone(),
            Self::Text(s) => Value::String(s.clone()),
            Self::Empty => Value::Null,
        }
    }
}

/// Classified response
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Payload),
    /// 404; single-resource fetches yield `None`
    NotFound,
    /// 401; session must be cleared
    Unauthorized,
    /// Any other non-2xx, with the best available message
    ApiError(String),
}

/// True for `application/json` and `+json` media types
pub fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
}

/// Parse a successful body.
///
/// A body that does not match its declared JSON type falls back to raw text.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Payload {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Payload::Empty;
    }
    if is_json(content_type) {
        if let Ok(value) = serde_json::from_slice::<Value>(body) {
            return Payload::Json(value);
        }
        tracing::debug!("Response declared JSON but did not parse, using text");
    }
    Payload::Text(String::from_utf8_lossy(body).into_owned())
}

/// Best message from an error body: JSON `error`, then `message`, then the
/// raw text. `None` when the body carries nothing usable.
pub fn extract_error_message(content_type: Option<&str>, body: &[u8]) -> Option<String> {
    if is_json(content_type) {
        if let Ok(Value::Object(obj)) = serde_json::from_slice::<Value>(body) {
            let message = ["error", "message"].iter().find_map(|key| match obj.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
                _ => None,
            });
            if message.is_some() {
                return message;
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Classify a response. `body` is `None` when it could not be read.
pub fn classify(status: StatusCode, content_type: Option<&str>, body: Option<&[u8]>) -> Outcome {
    if status.is_success() {
        return Outcome::Success(
            body.map(|b| parse_body(content_type, b))
                .unwrap_or(Payload::Empty),
        );
    }

    match status {
        StatusCode::NOT_FOUND => Outcome::NotFound,
        StatusCode::UNAUTHORIZED => Outcome::Unauthorized,
        _ => {
            let message = match body {
                Some(b) => extract_error_message(content_type, b)
                    .unwrap_or_else(|| format!("API Error: {}", status.as_u16())),
                None => format!(
                    "API Error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )
                .trim_end()
                .to_string(),
            };
            Outcome::ApiError(message)
        }
    }
}
