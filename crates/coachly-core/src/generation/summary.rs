//! Previous-session recap generation.

use std::sync::Arc;

use coachly_types::config::GlobalConfig;
use coachly_types::conversation::ConversationId;
use coachly_types::llm::{CompletionRequest, LlmMessage};
use coachly_types::message::{Message, SenderType};
use coachly_types::reply::GenerationError;

use super::provider::LlmProvider;
use crate::repository::message::MessageRepository;

/// Returned for a prior session with no messages at all.
pub const EMPTY_SESSION_SUMMARY: &str =
    "This session just started and doesn't have any messages yet.";

/// Returned when the model answers with nothing.
pub const FALLBACK_SUMMARY: &str = "Unable to generate summary";

/// Trait for anything that can recap a finished conversation.
pub trait SummaryService: Send + Sync {
    fn summarize(
        &self,
        conversation_id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<String, GenerationError>> + Send;
}

impl<T: SummaryService> SummaryService for Arc<T> {
    fn summarize(
        &self,
        conversation_id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<String, GenerationError>> + Send {
        (**self).summarize(conversation_id)
    }
}

/// Render messages as `User: ..` / `Coach: ..` blocks separated by blank lines.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let who = match m.sender {
                SenderType::User => "User",
                SenderType::Coach => "Coach",
            };
            format!("{who}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the recap instruction around a rendered transcript.
pub fn summary_prompt(transcript: &str) -> String {
    format!(
        "You are a helpful assistant that creates brief, insightful summaries of coaching sessions.\n\
         \n\
         Below is a conversation between a user and their coach. Create a concise summary (2-3 sentences) that captures:\n\
         1. The main topic or challenge discussed\n\
         2. Key insights or progress made\n\
         3. Any action items or next steps\n\
         \n\
         Keep it conversational and encouraging. This will be shown to the user when they start their next session.\n\
         \n\
         Conversation:\n\
         {transcript}\n\
         \n\
         Provide only the summary, no preamble or explanation."
    )
}

/// Default [`SummaryService`]: reads the stored transcript and asks the LLM
/// for a short recap.
pub struct SessionSummarizer<M: MessageRepository, P: LlmProvider> {
    messages: M,
    llm: Option<P>,
    model: String,
    max_tokens: u32,
    transcript_limit: usize,
}

impl<M: MessageRepository, P: LlmProvider> SessionSummarizer<M, P> {
    pub fn new(messages: M, llm: Option<P>, config: &GlobalConfig) -> Self {
        Self {
            messages,
            llm,
            model: config.summary.model.clone(),
            max_tokens: config.summary.max_tokens,
            transcript_limit: config.summary.transcript_limit,
        }
    }
}

impl<M: MessageRepository, P: LlmProvider> SummaryService for SessionSummarizer<M, P> {
    #[tracing::instrument(skip(self), fields(conversation_id = %conversation_id))]
    async fn summarize(&self, conversation_id: &ConversationId) -> Result<String, GenerationError> {
        let messages = self
            .messages
            .list(conversation_id, Some(self.transcript_limit as i64))
            .await
            .map_err(|e| GenerationError::Transcript(e.to_string()))?;

        if messages.is_empty() {
            return Ok(EMPTY_SESSION_SUMMARY.to_string());
        }

        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| GenerationError::NotConfigured("ANTHROPIC_API_KEY is not set".into()))?;

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![LlmMessage::user(summary_prompt(&render_transcript(&messages)))],
            system: None,
            max_tokens: self.max_tokens,
            temperature: None,
        };

        let response = llm.complete(&request).await?;
        let summary = response.content.trim();
        if summary.is_empty() {
            tracing::warn!("summary model returned no text");
            return Ok(FALLBACK_SUMMARY.to_string());
        }

        tracing::info!(messages = messages.len(), "session recap generated");
        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryStore, MockLlm};
    use coachly_types::llm::LlmError;

    fn seed(store: &InMemoryStore, conv: ConversationId, n: usize) {
        for i in 0..n {
            let sender = if i % 2 == 0 { SenderType::User } else { SenderType::Coach };
            store.seed_message(Message::new(conv, sender, format!("line {i}")));
        }
    }

    #[test]
    fn transcript_uses_role_prefixes() {
        let conv = ConversationId::new();
        let rendered = render_transcript(&[
            Message::new(conv, SenderType::User, "I want to run a 10k."),
            Message::new(conv, SenderType::Coach, "Great goal."),
        ]);
        assert_eq!(rendered, "User: I want to run a 10k.\n\nCoach: Great goal.");
    }

    #[test]
    fn prompt_embeds_transcript() {
        let prompt = summary_prompt("User: hi");
        assert!(prompt.contains("(2-3 sentences)"));
        assert!(prompt.contains("Conversation:\nUser: hi\n\nProvide only the summary"));
    }

    #[tokio::test]
    async fn empty_transcript_skips_the_model() {
        let store = InMemoryStore::new();
        let llm = MockLlm::replying("should not be used");
        let summarizer = SessionSummarizer::new(store, Some(llm.clone()), &GlobalConfig::default());

        let summary = summarizer.summarize(&ConversationId::new()).await.unwrap();
        assert_eq!(summary, EMPTY_SESSION_SUMMARY);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn transcript_is_capped_to_first_fifty_messages() {
        let store = InMemoryStore::new();
        let conv = ConversationId::new();
        seed(&store, conv, 60);
        let llm = MockLlm::replying("Discussed morning routines.");
        let summarizer = SessionSummarizer::new(store, Some(llm.clone()), &GlobalConfig::default());

        let summary = summarizer.summarize(&conv).await.unwrap();
        assert_eq!(summary, "Discussed morning routines.");

        let request = llm.last_request().unwrap();
        assert_eq!(request.max_tokens, 300);
        let prompt = &request.messages[0].content;
        assert!(prompt.contains("User: line 0"));
        assert!(prompt.contains("Coach: line 49"));
        assert!(!prompt.contains("line 50"));
    }

    #[tokio::test]
    async fn blank_model_output_falls_back() {
        let store = InMemoryStore::new();
        let conv = ConversationId::new();
        seed(&store, conv, 2);
        let summarizer = SessionSummarizer::new(store, Some(MockLlm::replying("")), &GlobalConfig::default());

        assert_eq!(summarizer.summarize(&conv).await.unwrap(), FALLBACK_SUMMARY);
    }

    #[tokio::test]
    async fn provider_error_is_reported() {
        let store = InMemoryStore::new();
        let conv = ConversationId::new();
        seed(&store, conv, 2);
        let summarizer = SessionSummarizer::new(
            store,
            Some(MockLlm::failing(LlmError::Overloaded("busy".into()))),
            &GlobalConfig::default(),
        );

        let err = summarizer.summarize(&conv).await.unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }
}
