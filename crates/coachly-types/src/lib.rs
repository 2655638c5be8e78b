//! Shared domain types for Coachly.
//!
//! This crate contains the core domain types used across the Coachly platform:
//! Coach, Conversation (session), Message, quota state, vendor request shapes,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod coach;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod message;
pub mod quota;
pub mod reply;
pub mod user;
