//! Chat message types.
//!
//! Messages are immutable once stored and displayed in `created_at` order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::conversation::ConversationId;

/// Metadata key marking a greeting seeded from a previous-session recap.
pub const RECAP_METADATA_KEY: &str = "recap";

/// Who authored a message.
///
/// Maps to `CHECK (sender IN ('user', 'coach'))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Coach,
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderType::User => write!(f, "user"),
            SenderType::Coach => write!(f, "coach"),
        }
    }
}

impl FromStr for SenderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(SenderType::User),
            "coach" => Ok(SenderType::Coach),
            other => Err(format!("invalid sender type: '{other}'")),
        }
    }
}

/// A single message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender: SenderType,
    pub content: String,
    /// Free-form JSON object. `{"recap": true}` marks a recap greeting.
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Message {
    /// Build a new message with empty metadata, stamped now.
    pub fn new(conversation_id: ConversationId, sender: SenderType, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            sender,
            content: content.into(),
            metadata: empty_metadata(),
            created_at: Utc::now(),
        }
    }

    /// Mark this message as a recap-seeded greeting.
    pub fn with_recap_flag(mut self) -> Self {
        if let serde_json::Value::Object(map) = &mut self.metadata {
            map.insert(RECAP_METADATA_KEY.to_string(), serde_json::Value::Bool(true));
        }
        self
    }

    pub fn is_recap(&self) -> bool {
        self.metadata
            .get(RECAP_METADATA_KEY)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == SenderType::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_roundtrip() {
        for sender in [SenderType::User, SenderType::Coach] {
            let parsed: SenderType = sender.to_string().parse().unwrap();
            assert_eq!(sender, parsed);
        }
        assert!("assistant".parse::<SenderType>().is_err());
    }

    #[test]
    fn test_recap_flag() {
        let conv = ConversationId::new();
        let plain = Message::new(conv, SenderType::Coach, "Hello!");
        assert!(!plain.is_recap());
        assert_eq!(plain.metadata, serde_json::json!({}));

        let recap = plain.with_recap_flag();
        assert!(recap.is_recap());
        assert_eq!(recap.metadata, serde_json::json!({"recap": true}));
    }

    #[test]
    fn test_missing_metadata_defaults_to_object() {
        let conv = ConversationId::new();
        let json = format!(
            r#"{{"id":"{}","conversation_id":"{}","sender":"user","content":"hi","created_at":"2025-01-01T00:00:00Z"}}"#,
            Uuid::now_v7(),
            conv
        );
        let msg: Message = serde_json::from_str(&json).unwrap();
        assert!(msg.metadata.is_object());
        assert!(msg.is_from_user());
    }
}
