//! LLM provider implementations.
//!
//! Contains the concrete [`LlmProvider`](coachly_core::generation::provider::LlmProvider)
//! used for coach replies and session recaps.

pub mod anthropic;

pub use anthropic::AnthropicProvider;
