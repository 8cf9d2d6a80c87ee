//! Inbound chat items, classified before interpretation.
//!
//! The chat transport feeds raw JSON objects into the ears channel. The
//! listener classifies each one by its `type` field into a concrete
//! event; anything unrecognized stays a free-form inbound event so
//! subscribers can still observe it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PalaverError, Result};

/// A textual message, maybe carrying a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub text: Option<String>,
    /// Rendered content (e.g. markdown) when it differs from the text.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "personId")]
    pub from_id: Option<String>,
    #[serde(default, alias = "personEmail")]
    pub from_label: Option<String>,
    #[serde(default, alias = "roomId", alias = "spaceId")]
    pub channel_id: Option<String>,
    #[serde(default, alias = "mentionedPeople")]
    pub mentioned_ids: Vec<String>,
    /// External name of an uploaded file, when any.
    #[serde(default)]
    pub attachment: Option<String>,
    /// Handle by which uploaded content can be retrieved.
    #[serde(default)]
    pub url: Option<String>,
}

/// A file attached to the chat channel, without message text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatAttachment {
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "personId")]
    pub from_id: Option<String>,
    #[serde(default, alias = "roomId", alias = "spaceId")]
    pub channel_id: Option<String>,
}

/// Somebody joined or left a chat channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatPresence {
    #[serde(default, alias = "personId")]
    pub actor_id: Option<String>,
    #[serde(default, alias = "personDisplayName")]
    pub actor_label: Option<String>,
    #[serde(default, alias = "roomId", alias = "spaceId")]
    pub channel_id: Option<String>,
}

/// One classified inbound chat item.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(ChatMessage),
    Attachment(ChatAttachment),
    Join(ChatPresence),
    Leave(ChatPresence),
    /// Anything with an unrecognized `type` field.
    Inbound(Value),
}

impl ChatEvent {
    /// Classifies one raw item from the ears channel.
    ///
    /// A JSON-encoded string is decoded first. The item must then be an
    /// object; its `type` field selects the event kind, and an object
    /// with no `type` field at all is treated as a message.
    pub fn from_value(raw: Value) -> Result<ChatEvent> {
        let item = match raw {
            Value::String(text) => serde_json::from_str::<Value>(&text)
                .map_err(|_| PalaverError::MalformedEvent(text))?,
            other => other,
        };
        if !item.is_object() {
            return Err(PalaverError::MalformedEvent(item.to_string()));
        }

        let kind = item
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("message")
            .to_string();

        let event = match kind.as_str() {
            "message" => ChatEvent::Message(serde_json::from_value(item)?),
            "attachment" => ChatEvent::Attachment(serde_json::from_value(item)?),
            "join" => ChatEvent::Join(serde_json::from_value(item)?),
            "leave" => ChatEvent::Leave(serde_json::from_value(item)?),
            _ => ChatEvent::Inbound(item),
        };
        Ok(event)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChatEvent::Message(_) => "message",
            ChatEvent::Attachment(_) => "attachment",
            ChatEvent::Join(_) => "join",
            ChatEvent::Leave(_) => "leave",
            ChatEvent::Inbound(_) => "inbound",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_type_is_a_message() {
        let event = ChatEvent::from_value(json!({
            "text": "/shelly echo hi",
            "personId": "other",
        }))
        .unwrap();
        let ChatEvent::Message(message) = event else {
            panic!("expected a message");
        };
        assert_eq!(message.text.as_deref(), Some("/shelly echo hi"));
        assert_eq!(message.from_id.as_deref(), Some("other"));
    }

    #[test]
    fn test_unknown_type_is_inbound() {
        let event = ChatEvent::from_value(json!({"type": "reaction", "emoji": "+1"})).unwrap();
        assert_eq!(event.kind(), "inbound");
    }

    #[test]
    fn test_scalar_item_is_malformed() {
        assert!(ChatEvent::from_value(json!(42)).is_err());
    }

    #[test]
    fn test_json_encoded_string_is_decoded() {
        let event =
            ChatEvent::from_value(json!("{\"type\": \"join\", \"personId\": \"alice\"}")).unwrap();
        let ChatEvent::Join(presence) = event else {
            panic!("expected a join");
        };
        assert_eq!(presence.actor_id.as_deref(), Some("alice"));
    }
}
