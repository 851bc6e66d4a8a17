//! Turns a raw response into a JSON payload or a structured HTTP error.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::RawResponse;

/// Body as JSON when it parses, the raw text when it doesn't, `Null` when empty.
pub fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Error message for a failed response: the body's `message`, then `error`,
/// then a generic line with the status.
pub fn error_message(status: u16, body: &Value) -> String {
    ["message", "error"]
        .iter()
        .filter_map(|k| body.get(k))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Null | Value::Bool(false) | Value::String(_) => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| format!("Request failed: {}", status))
}

pub async fn handle_json(response: RawResponse) -> Result<Value> {
    let status = response.status;
    let url = response.url.clone();
    let text = response.text().await?;
    let data = parse_body(&text);

    if !status.is_success() {
        log::warn!("HTTP {} for {}", status.as_u16(), url);
        return Err(Error::Http {
            status: status.as_u16(),
            message: error_message(status.as_u16(), &data),
            body: data,
        });
    }
    Ok(data)
}
