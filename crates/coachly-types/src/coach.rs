use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

/// Unique identifier for a coach, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoachId(pub Uuid);

impl CoachId {
    /// Create a new CoachId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a CoachId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CoachId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CoachId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CoachId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An AI coaching persona.
///
/// Coaches are authored by a creator and can be used by many users. The
/// creator is fixed at creation; everything else may be edited until the
/// coach is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coach {
    pub id: CoachId,
    pub creator_id: UserId,
    /// Display name ("Sarah").
    pub name: String,
    /// Short role line ("Productivity Coach").
    pub title: String,
    pub description: String,
    pub avatar_url: Option<String>,
    pub specialties: Vec<String>,
    pub personality_traits: Vec<String>,
    /// Behavioral system prompt sent with every reply request.
    pub system_prompt: String,
    /// Video replica reference. Coaches without one only offer text sessions.
    pub video_persona_id: Option<String>,
    pub is_public: bool,
    /// Number of sessions started with this coach, across all users.
    pub use_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coach {
    /// Whether this coach can host live video sessions.
    pub fn supports_video(&self) -> bool {
        self.video_persona_id
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    /// Public coaches are visible to everyone, private ones only to their creator.
    pub fn visible_to(&self, user: &UserId) -> bool {
        self.is_public || self.creator_id == *user
    }
}

/// Request to create a new coach.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCoachRequest {
    pub name: String,
    pub title: String,
    pub description: String,
    pub system_prompt: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub personality_traits: Vec<String>,
    pub avatar_url: Option<String>,
    pub video_persona_id: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Request to update an existing coach. Only set fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCoachRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub specialties: Option<Vec<String>>,
    pub personality_traits: Option<Vec<String>>,
    pub avatar_url: Option<String>,
    pub video_persona_id: Option<String>,
    pub is_public: Option<bool>,
}
