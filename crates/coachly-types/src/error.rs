use thiserror::Error;

use std::fmt;

use crate::conversation::{Conversation, SessionKind};
use crate::message::Message;
use crate::reply::GenerationError;

/// Errors from repository operations (used by trait definitions in coachly-core).
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors related to coach catalogue operations.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("coach not found")]
    NotFound,

    #[error("missing required fields: {0}")]
    MissingFields(String),

    #[error("at least one specialty is required")]
    MissingSpecialties,

    #[error("only the coach's creator may modify it")]
    NotCreator,

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Step of the begin-session sequence, used to report where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    LoadCoach,
    LoadConversation,
    ArchiveActive,
    FindPrior,
    InsertConversation,
    SeedGreeting,
    CountUsage,
    EndSession,
    ListSessions,
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStep::LoadCoach => "load coach",
            SessionStep::LoadConversation => "load conversation",
            SessionStep::ArchiveActive => "archive active session",
            SessionStep::FindPrior => "find previous session",
            SessionStep::InsertConversation => "insert conversation",
            SessionStep::SeedGreeting => "seed greeting",
            SessionStep::CountUsage => "count coach usage",
            SessionStep::EndSession => "end session",
            SessionStep::ListSessions => "list sessions",
        };
        write!(f, "{s}")
    }
}

/// Errors from the session lifecycle.
///
/// The begin-session sequence is not atomic. `Storage` means no conversation
/// row was written by this call (an earlier active session may already have
/// been archived). `Incomplete` means the new conversation exists but a later
/// step failed; nothing is rolled back.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("coach not found")]
    CoachNotFound,

    #[error("conversation not found")]
    ConversationNotFound,

    #[error("{kind} sessions are not available for this coach")]
    VideoUnavailable { kind: SessionKind },

    /// Another session was started for the key after this offer was made.
    #[error("the offer for session {session_number} is out of date; begin the session again")]
    StaleOffer { session_number: u32 },

    #[error("failed to {step}: {source}")]
    Storage {
        step: SessionStep,
        #[source]
        source: RepositoryError,
    },

    #[error("session {} was created but could not {step}: {source}", .conversation.id)]
    Incomplete {
        conversation: Box<Conversation>,
        step: SessionStep,
        #[source]
        source: RepositoryError,
    },
}

impl SessionError {
    pub fn storage(step: SessionStep) -> impl FnOnce(RepositoryError) -> Self {
        move |source| SessionError::Storage { step, source }
    }
}

/// Errors from sending a chat message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("a message is already being sent in this conversation")]
    SendInFlight,

    #[error("free message limit of {limit} reached; upgrade to premium for unlimited messaging")]
    QuotaExceeded { limit: u32 },

    #[error("no unanswered message to retry")]
    NothingToRetry,

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// The user message was stored but no coach reply was generated.
    /// The user message stays.
    #[error("coach reply failed: {reason}")]
    ReplyFailed {
        user_message: Box<Message>,
        reason: GenerationError,
    },

    /// A reply was generated but could not be stored. The user message stays.
    #[error("coach reply could not be saved: {source}")]
    ReplyNotStored {
        user_message: Box<Message>,
        #[source]
        source: RepositoryError,
    },
}

impl SendError {
    /// The stored-but-unanswered user message, when the send stopped halfway.
    pub fn orphaned_message(&self) -> Option<&Message> {
        match self {
            SendError::ReplyFailed { user_message, .. }
            | SendError::ReplyNotStored { user_message, .. } => Some(user_message),
            _ => None,
        }
    }

    /// Whether the caller should be offered the paywall.
    pub fn is_paywall(&self) -> bool {
        matches!(self, SendError::QuotaExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::CoachId;
    use crate::conversation::SessionKey;
    use crate::user::UserId;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_session_storage_error_names_step() {
        let err = SessionError::storage(SessionStep::FindPrior)(RepositoryError::Connection);
        assert_eq!(
            err.to_string(),
            "failed to find previous session: database connection error"
        );
    }

    #[test]
    fn test_incomplete_error_mentions_conversation() {
        let key = SessionKey::new(UserId::new(), CoachId::new(), SessionKind::Text);
        let conv = Conversation::new_active(key, 2, None);
        let id = conv.id;
        let err = SessionError::Incomplete {
            conversation: Box::new(conv),
            step: SessionStep::SeedGreeting,
            source: RepositoryError::Connection,
        };
        assert!(err.to_string().contains(&id.to_string()));
        assert!(err.to_string().contains("seed greeting"));
    }

    #[test]
    fn test_quota_error_is_paywall() {
        let err = SendError::QuotaExceeded { limit: 10 };
        assert!(err.is_paywall());
        assert!(err.to_string().contains("10"));
        assert!(!SendError::EmptyMessage.is_paywall());
    }
}
