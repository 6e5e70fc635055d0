//! Chat message shapes exchanged with callers and the completion provider.

use serde::{Deserialize, Serialize};

/// Role of the system preamble.
pub const SYSTEM_ROLE: &str = "system";

/// One message in a chat transcript.
///
/// `content` is nullable: assistant turns carrying tool calls have no text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: SYSTEM_ROLE.to_string(),
            content: Some(content.into()),
        }
    }
}

/// Body of `POST /api/conversation`.
///
/// `messages` is kept as raw JSON: only its presence is checked before
/// gating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationRequest {
    pub messages: Option<serde_json::Value>,
}

impl ConversationRequest {
    /// Extract `messages` from a parsed body.
    ///
    /// A `null` body is rejected. Any other non-object body, or an object
    /// whose `messages` is absent or `null`, yields `messages: None`.
    pub fn from_json(body: serde_json::Value) -> Result<Self, serde_json::Error> {
        match body {
            serde_json::Value::Null => Err(<serde_json::Error as serde::de::Error>::custom(
                "request body is null",
            )),
            serde_json::Value::Object(mut fields) => Ok(Self {
                messages: fields.remove("messages").filter(|m| !m.is_null()),
            }),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        Self::from_json(serde_json::from_slice(body)?)
    }
}
