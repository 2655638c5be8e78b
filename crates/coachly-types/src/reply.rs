//! Request and response shapes for the coach reply and recap capabilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::SessionKind;
use crate::llm::{LlmError, LlmMessage};

/// Input to the coach reply capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachReplyRequest {
    /// Prior turns, oldest first, excluding `user_message`.
    pub transcript: Vec<LlmMessage>,
    /// The newest user utterance. Video joins send a fixed opener.
    pub user_message: String,
    /// The coach's behavioral system prompt.
    pub system_prompt: String,
    pub kind: SessionKind,
    /// Required for video sessions.
    pub video_persona_id: Option<String>,
}

/// Output of the coach reply capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoachReply {
    Text { content: String },
    Video(VideoConversation),
}

/// Request to open a live video conversation with a persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConversationRequest {
    pub persona_id: String,
    pub conversation_name: String,
    /// Behavioral context handed to the video persona.
    pub context: String,
    pub greeting: String,
}

/// A joinable live video conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConversation {
    pub conversation_url: String,
    pub conversation_id: String,
}

/// Failure of a vendor-backed generation call (reply, recap, or video join).
///
/// All variants render to a single user-presentable reason string.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("video provider error: {0}")]
    Video(String),

    #[error("this coach does not have video capabilities enabled")]
    MissingPersona,

    #[error("could not load transcript: {0}")]
    Transcript(String),

    #[error("generation service not configured: {0}")]
    NotConfigured(String),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coach_reply_serde_tagged() {
        let reply = CoachReply::Text {
            content: "Let's begin.".to_string(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["content"], "Let's begin.");

        let video = CoachReply::Video(VideoConversation {
            conversation_url: "https://tavus.daily.co/abc".to_string(),
            conversation_id: "abc".to_string(),
        });
        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["conversation_id"], "abc");
    }

    #[test]
    fn test_generation_error_reason() {
        let err = GenerationError::from(LlmError::AuthenticationFailed);
        assert_eq!(err.to_string(), "authentication failed");
        assert!(GenerationError::MissingPersona.to_string().contains("video"));
    }
}
