//! LlmProvider and VideoSessionProvider trait definitions.
//!
//! These are the vendor seams. Uses RPITIT (Rust 2024 edition); the
//! `Arc<T>` impls let one provider be shared by several services.

use std::sync::Arc;

use coachly_types::llm::{CompletionRequest, CompletionResponse, LlmError};
use coachly_types::reply::{GenerationError, VideoConversation, VideoConversationRequest};

/// Trait for LLM provider backends.
///
/// Implementations live in coachly-infra (e.g., `AnthropicProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}

impl<T: LlmProvider> LlmProvider for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send {
        (**self).complete(request)
    }
}

/// Trait for live video conversation backends.
///
/// Implementations live in coachly-infra (e.g., `TavusClient`).
pub trait VideoSessionProvider: Send + Sync {
    /// Open a joinable conversation with a video persona.
    fn create_conversation(
        &self,
        request: &VideoConversationRequest,
    ) -> impl std::future::Future<Output = Result<VideoConversation, GenerationError>> + Send;
}

impl<T: VideoSessionProvider> VideoSessionProvider for Arc<T> {
    fn create_conversation(
        &self,
        request: &VideoConversationRequest,
    ) -> impl std::future::Future<Output = Result<VideoConversation, GenerationError>> + Send {
        (**self).create_conversation(request)
    }
}
