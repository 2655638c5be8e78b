//! Global configuration types for Coachly.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! free message allotment, reply/recap generation, and video sessions.

use serde::{Deserialize, Serialize};

use crate::quota::FREE_MESSAGE_LIMIT;

/// Top-level configuration. Loaded from `~/.coachly/config.toml`; every field
/// has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// User messages allowed per conversation on the free tier.
    #[serde(default = "default_free_message_limit")]
    pub free_message_limit: u32,

    /// Prior messages sent with each reply request (most recent last).
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    #[serde(default)]
    pub reply: ReplyConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub video: VideoConfig,
}

fn default_free_message_limit() -> u32 {
    FREE_MESSAGE_LIMIT
}

fn default_history_window() -> usize {
    20
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            free_message_limit: default_free_message_limit(),
            history_window: default_history_window(),
            anthropic_base_url: default_anthropic_base_url(),
            reply: ReplyConfig::default(),
            summary: SummaryConfig::default(),
            video: VideoConfig::default(),
        }
    }
}

/// Coach reply generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_reply_max_tokens")]
    pub max_tokens: u32,
}

fn default_reply_max_tokens() -> u32 {
    1024
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_reply_max_tokens(),
        }
    }
}

/// Previous-session recap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_summary_max_tokens")]
    pub max_tokens: u32,
    /// Earliest messages of the prior session fed to the summarizer.
    #[serde(default = "default_transcript_limit")]
    pub transcript_limit: usize,
}

fn default_summary_max_tokens() -> u32 {
    300
}

fn default_transcript_limit() -> usize {
    50
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_summary_max_tokens(),
            transcript_limit: default_transcript_limit(),
        }
    }
}

/// Live video session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_video_base_url")]
    pub base_url: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Seconds.
    #[serde(default = "default_max_call_duration")]
    pub max_call_duration: u32,
    /// Seconds.
    #[serde(default = "default_participant_left_timeout")]
    pub participant_left_timeout: u32,
    #[serde(default)]
    pub enable_recording: bool,
}

fn default_video_base_url() -> String {
    "https://tavusapi.com".to_string()
}

fn default_greeting() -> String {
    "Hello! I'm here to help you with your coaching needs. How can I support you today?".to_string()
}

fn default_max_call_duration() -> u32 {
    3600
}

fn default_participant_left_timeout() -> u32 {
    30
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            base_url: default_video_base_url(),
            greeting: default_greeting(),
            max_call_duration: default_max_call_duration(),
            participant_left_timeout: default_participant_left_timeout(),
            enable_recording: false,
        }
    }
}
