//! Coach reply capability.
//!
//! Text sessions get a completion from the LLM provider, seeded with the
//! coach's system prompt and the recent transcript. Video sessions get a
//! joinable conversation URL from the video provider instead.

use std::sync::Arc;

use chrono::Utc;

use coachly_types::config::GlobalConfig;
use coachly_types::conversation::SessionKind;
use coachly_types::llm::{CompletionRequest, LlmMessage};
use coachly_types::reply::{
    CoachReply, CoachReplyRequest, GenerationError, VideoConversationRequest,
};

use super::provider::{LlmProvider, VideoSessionProvider};

/// Trait for anything that can answer a coaching turn.
pub trait CoachReplyService: Send + Sync {
    fn reply(
        &self,
        request: &CoachReplyRequest,
    ) -> impl std::future::Future<Output = Result<CoachReply, GenerationError>> + Send;
}

impl<T: CoachReplyService> CoachReplyService for Arc<T> {
    fn reply(
        &self,
        request: &CoachReplyRequest,
    ) -> impl std::future::Future<Output = Result<CoachReply, GenerationError>> + Send {
        (**self).reply(request)
    }
}

/// Default [`CoachReplyService`] backed by an LLM and a video provider.
///
/// Either provider may be absent (no API key configured); requests that
/// need it then fail with `GenerationError::NotConfigured`.
pub struct CoachReplyGenerator<P: LlmProvider, V: VideoSessionProvider> {
    llm: Option<P>,
    video: Option<V>,
    model: String,
    max_tokens: u32,
    video_greeting: String,
}

impl<P: LlmProvider, V: VideoSessionProvider> CoachReplyGenerator<P, V> {
    pub fn new(llm: Option<P>, video: Option<V>, config: &GlobalConfig) -> Self {
        Self {
            llm,
            video,
            model: config.reply.model.clone(),
            max_tokens: config.reply.max_tokens,
            video_greeting: config.video.greeting.clone(),
        }
    }

    /// Build the LLM request for a text turn.
    pub fn completion_request(&self, request: &CoachReplyRequest) -> CompletionRequest {
        let mut messages = request.transcript.clone();
        messages.push(LlmMessage::user(request.user_message.clone()));
        CompletionRequest {
            model: self.model.clone(),
            messages,
            system: Some(request.system_prompt.clone()),
            max_tokens: self.max_tokens,
            temperature: None,
        }
    }

    async fn text_reply(&self, request: &CoachReplyRequest) -> Result<CoachReply, GenerationError> {
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| GenerationError::NotConfigured("ANTHROPIC_API_KEY is not set".into()))?;

        let response = llm.complete(&self.completion_request(request)).await?;
        let content = response.content.trim();
        if content.is_empty() {
            return Err(GenerationError::UnexpectedReply(
                "model returned an empty reply".into(),
            ));
        }

        tracing::debug!(
            provider = llm.name(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "coach reply generated"
        );

        Ok(CoachReply::Text {
            content: content.to_string(),
        })
    }

    async fn video_reply(&self, request: &CoachReplyRequest) -> Result<CoachReply, GenerationError> {
        let persona_id = request
            .video_persona_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(GenerationError::MissingPersona)?;
        let video = self
            .video
            .as_ref()
            .ok_or_else(|| GenerationError::NotConfigured("TAVUS_API_KEY is not set".into()))?;

        let conversation = video
            .create_conversation(&VideoConversationRequest {
                persona_id: persona_id.to_string(),
                conversation_name: format!("Coaching Session {}", Utc::now().timestamp_millis()),
                context: request.system_prompt.clone(),
                greeting: self.video_greeting.clone(),
            })
            .await?;

        Ok(CoachReply::Video(conversation))
    }
}

impl<P: LlmProvider, V: VideoSessionProvider> CoachReplyService for CoachReplyGenerator<P, V> {
    #[tracing::instrument(skip_all, fields(kind = %request.kind, transcript_len = request.transcript.len()))]
    async fn reply(&self, request: &CoachReplyRequest) -> Result<CoachReply, GenerationError> {
        match request.kind {
            SessionKind::Text => self.text_reply(request).await,
            SessionKind::Video => self.video_reply(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLlm, MockVideo};
    use coachly_types::llm::{LlmError, MessageRole};

    fn text_request() -> CoachReplyRequest {
        CoachReplyRequest {
            transcript: vec![
                LlmMessage::assistant("Hello! How can I help?"),
                LlmMessage::user("I keep snoozing my alarm."),
                LlmMessage::assistant("What time do you go to bed?"),
            ],
            user_message: "Around 1am.".to_string(),
            system_prompt: "You are Sarah, a productivity coach.".to_string(),
            kind: SessionKind::Text,
            video_persona_id: None,
        }
    }

    #[test]
    fn completion_request_appends_user_turn_and_system_prompt() {
        let generator: CoachReplyGenerator<MockLlm, MockVideo> =
            CoachReplyGenerator::new(None, None, &GlobalConfig::default());
        let req = generator.completion_request(&text_request());

        assert_eq!(req.max_tokens, 1024);
        assert_eq!(req.system.as_deref(), Some("You are Sarah, a productivity coach."));
        assert_eq!(req.messages.len(), 4);
        let last = req.messages.last().unwrap();
        assert_eq!(last.role, MessageRole::User);
        assert_eq!(last.content, "Around 1am.");
    }

    #[tokio::test]
    async fn text_reply_trims_model_output() {
        let llm = MockLlm::replying("  Try a wind-down routine at 11pm.  ");
        let generator = CoachReplyGenerator::new(Some(llm.clone()), None::<MockVideo>, &GlobalConfig::default());

        let reply = generator.reply(&text_request()).await.unwrap();
        assert_eq!(
            reply,
            CoachReply::Text {
                content: "Try a wind-down routine at 11pm.".to_string()
            }
        );
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn empty_model_output_is_an_error() {
        let generator = CoachReplyGenerator::new(
            Some(MockLlm::replying("   ")),
            None::<MockVideo>,
            &GlobalConfig::default(),
        );
        let err = generator.reply(&text_request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::UnexpectedReply(_)));
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_generation_error() {
        let generator = CoachReplyGenerator::new(
            Some(MockLlm::failing(LlmError::AuthenticationFailed)),
            None::<MockVideo>,
            &GlobalConfig::default(),
        );
        let err = generator.reply(&text_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "authentication failed");
    }

    #[tokio::test]
    async fn missing_llm_is_not_configured() {
        let generator: CoachReplyGenerator<MockLlm, MockVideo> =
            CoachReplyGenerator::new(None, None, &GlobalConfig::default());
        let err = generator.reply(&text_request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn video_reply_requires_persona() {
        let video = MockVideo::default();
        let generator = CoachReplyGenerator::new(None::<MockLlm>, Some(video.clone()), &GlobalConfig::default());
        let mut request = text_request();
        request.kind = SessionKind::Video;
        request.video_persona_id = Some("  ".to_string());

        let err = generator.reply(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingPersona));
        assert!(video.requests().is_empty());
    }

    #[tokio::test]
    async fn video_reply_passes_prompt_and_greeting() {
        let video = MockVideo::default();
        let generator = CoachReplyGenerator::new(None::<MockLlm>, Some(video.clone()), &GlobalConfig::default());
        let mut request = text_request();
        request.kind = SessionKind::Video;
        request.video_persona_id = Some("r79e1c033f".to_string());

        let reply = generator.reply(&request).await.unwrap();
        assert!(matches!(reply, CoachReply::Video(_)));

        let sent = video.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].persona_id, "r79e1c033f");
        assert_eq!(sent[0].context, "You are Sarah, a productivity coach.");
        assert!(sent[0].conversation_name.starts_with("Coaching Session "));
        assert!(sent[0].greeting.starts_with("Hello! I'm here to help"));
    }
}
