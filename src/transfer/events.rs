//! Decoding of the newline-delimited JSON stream emitted by pull and push.
//!
//! Known detection gap: output without any line terminator, and lines that are
//! not JSON objects, produce no events. An error carried that way goes unnoticed.

use serde::{Deserialize, Deserializer};

/// One decoded line of transfer output
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransferEvent {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub error: Option<String>,
    #[serde(
        default,
        rename = "errorDetail",
        deserialize_with = "deserialize_text"
    )]
    pub error_detail: Option<String>,
}

impl TransferEvent {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Human-readable line for debug logging
    pub fn describe(&self) -> String {
        match (&self.id, &self.status) {
            (Some(id), Some(status)) => format!("{}: {}", id, status),
            (None, Some(status)) => status.clone(),
            _ => self.error.clone().unwrap_or_default(),
        }
    }
}

/// Any non-null JSON value as text; objects carrying a string `message` yield
/// that message. `errorDetail` is an object from the daemon but a plain string
/// from some proxies, and `error`/`id` are not always strings either.
fn value_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(map) => match map.get("message") {
            Some(serde_json::Value::String(message)) => Some(message.clone()),
            _ => Some(serde_json::Value::Object(map).to_string()),
        },
        other => Some(other.to_string()),
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<serde_json::Value>::deserialize(deserializer)?.and_then(value_text))
}

/// Decode raw transfer output into events, in order.
pub fn decode(raw: &str) -> Vec<TransferEvent> {
    if !raw.contains('\n') {
        return Vec::new();
    }

    raw.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<serde_json::Value>(line) {
            Ok(serde_json::Value::Object(map)) => Some(event_from_object(map)),
            _ => None,
        })
        .collect()
}

fn event_from_object(map: serde_json::Map<String, serde_json::Value>) -> TransferEvent {
    let take = |key: &str| map.get(key).cloned().and_then(value_text);
    TransferEvent {
        status: take("status"),
        id: take("id"),
        error: take("error"),
        error_detail: take("errorDetail"),
    }
}

/// First event that carries an `error` field
pub fn first_error(events: &[TransferEvent]) -> Option<&TransferEvent> {
    events.iter().find(|event| event.is_error())
}
