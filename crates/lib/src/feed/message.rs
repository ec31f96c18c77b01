//! Feed message types: what COMMS returns and what the bridge posts back.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque message identifier. COMMS may send numbers or strings; both normalise to the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for MessageId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            UInt(u64),
            Float(f64),
            Text(String),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => MessageId(n.to_string()),
            RawId::UInt(n) => MessageId(n.to_string()),
            RawId::Float(n) => MessageId(n.to_string()),
            RawId::Text(s) => MessageId(s),
        })
    }
}

/// Text field that tolerates numbers and booleans (rendered as text); anything else reads as absent.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// A message read from the feed. Only `id` is required; missing text fields read as empty.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedMessage {
    pub id: MessageId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sender_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sender_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message_type: Option<String>,
}

impl FeedMessage {
    pub fn new(
        id: impl Into<MessageId>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: Some(sender_id.into()),
            sender_name: None,
            content: Some(content.into()),
            message_type: None,
        }
    }

    pub fn sender_id(&self) -> &str {
        self.sender_id.as_deref().unwrap_or("")
    }

    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Body of `POST /api/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub sender_id: String,
    pub sender_name: String,
    pub sender_type: &'static str,
    pub content: String,
    pub message_type: String,
}

impl OutboundMessage {
    /// A `response` message posted by an agent.
    pub fn response(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            sender_type: "agent",
            content: content.into(),
            message_type: "response".to_string(),
        }
    }
}

/// Result of the health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    pub reachable: bool,
    pub detail: String,
}
