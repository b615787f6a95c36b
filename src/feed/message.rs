//! Stream messages and control frames.

use super::Quote;
use super::quote::WireQuote;
use crate::error::{Error, Result};
use crate::model::{FieldValue, Fields, Model, ToField, assign_field};
use serde::Deserialize;
use serde_json::Value;

/// Inbound message from the market data stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Credentials were accepted.
    Authorized,
    /// Credentials were rejected, with the reported status.
    Unauthorized(String),
    /// The server confirmed the streams it is sending.
    Listening(Vec<String>),
    Quote(Quote),
    /// Any other stream event, by stream name.
    Other(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    stream: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
struct ListeningData {
    #[serde(default)]
    streams: Vec<String>,
}

impl StreamMessage {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text).map_err(Error::Parse)?;

        if let Some(status) = envelope.data.get("status").and_then(Value::as_str) {
            return Ok(if status == "authorized" {
                Self::Authorized
            } else {
                Self::Unauthorized(status.to_string())
            });
        }

        if envelope.stream == "listening" {
            let data = ListeningData::deserialize(&envelope.data).unwrap_or_default();
            return Ok(Self::Listening(data.streams));
        }

        if envelope.data.get("ev").and_then(Value::as_str) == Some("Q") {
            let wire = WireQuote::deserialize(&envelope.data).map_err(|e| {
                Error::feed(format!("Malformed quote on {}: {e}", envelope.stream))
            })?;
            return Ok(Self::Quote(wire.into()));
        }

        Ok(Self::Other(envelope.stream))
    }
}

/// Outbound control frame: `{"action": ..., "data": ...}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlFrame {
    pub action: String,
    pub data: FieldValue,
}

impl ControlFrame {
    pub fn authenticate(key_id: &str, secret_key: &str) -> Self {
        Self {
            action: "authenticate".to_string(),
            data: FieldValue::object([("key_id", key_id), ("secret_key", secret_key)]),
        }
    }

    pub fn listen<I, S>(streams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_streams("listen", streams)
    }

    pub fn unlisten<I, S>(streams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_streams("unlisten", streams)
    }

    fn with_streams<I, S>(action: &str, streams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let streams = streams
            .into_iter()
            .map(|s| FieldValue::Text(s.into()))
            .collect::<Vec<_>>();
        Self {
            action: action.to_string(),
            data: FieldValue::object([("streams", FieldValue::List(streams))]),
        }
    }

    /// Compact JSON text of the frame.
    pub fn encode(&self) -> Result<String> {
        self.to_json()
    }
}

impl Model for ControlFrame {
    fn fields(&self) -> Fields {
        vec![
            ("action".into(), self.action.to_field()),
            ("data".into(), self.data.to_field()),
        ]
    }

    fn assign(&mut self, field: &str, value: &Value) -> Result<bool> {
        match field {
            "action" => assign_field(&mut self.action, field, value)?,
            "data" => self.data = FieldValue::from(value.clone()),
            _ => return Ok(false),
        }
        Ok(true)
    }
}
