//! Conversation (coaching session) types.
//!
//! A conversation is one numbered coaching session between a user and a
//! coach. Sessions are numbered per `(user, coach, kind)` triple, starting at
//! 1, and move one way through `Active -> Archived`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::coach::CoachId;
use crate::user::UserId;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Medium of a coaching session.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (session_kind IN ('text', 'video'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Text,
    Video,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Text => write!(f, "text"),
            SessionKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(SessionKind::Text),
            "video" => Ok(SessionKind::Video),
            other => Err(format!("invalid session kind: '{other}'")),
        }
    }
}

impl Default for SessionKind {
    fn default() -> Self {
        SessionKind::Text
    }
}

/// Lifecycle status of a conversation.
///
/// `Archived` is terminal: nothing moves a conversation back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationStatus::Active => write!(f, "active"),
            ConversationStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ConversationStatus::Active),
            "archived" => Ok(ConversationStatus::Archived),
            other => Err(format!("invalid conversation status: '{other}'")),
        }
    }
}

impl Default for ConversationStatus {
    fn default() -> Self {
        ConversationStatus::Active
    }
}

/// The triple that scopes session numbering and the single-active rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: UserId,
    pub coach_id: CoachId,
    pub kind: SessionKind,
}

impl SessionKey {
    pub fn new(user_id: UserId, coach_id: CoachId, kind: SessionKind) -> Self {
        Self {
            user_id,
            coach_id,
            kind,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.coach_id, self.kind)
    }
}

/// A single coaching session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub coach_id: CoachId,
    pub title: String,
    pub kind: SessionKind,
    pub status: ConversationStatus,
    /// 1-based, strictly increasing per session key.
    pub session_number: u32,
    /// Recap of the previous session, carried over when the user accepted one.
    pub session_summary: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Build a fresh active conversation for the given key and number.
    pub fn new_active(key: SessionKey, session_number: u32, session_summary: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            user_id: key.user_id,
            coach_id: key.coach_id,
            title: session_title(session_number),
            kind: key.kind,
            status: ConversationStatus::Active,
            session_number,
            session_summary,
            last_message_at: now,
            created_at: now,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.user_id, self.coach_id, self.kind)
    }

    pub fn is_active(&self) -> bool {
        self.status == ConversationStatus::Active
    }
}

/// Title shown for a numbered session.
pub fn session_title(session_number: u32) -> String {
    format!("Session {session_number}")
}
