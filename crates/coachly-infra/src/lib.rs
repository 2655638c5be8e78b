//! Infrastructure layer for Coachly.
//!
//! Contains implementations of the ports defined in `coachly-core`: SQLite
//! storage, the Anthropic Messages API provider, the Tavus video client, and
//! configuration loading.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod video;
