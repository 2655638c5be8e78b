//! Chat controller: one open conversation and its send/receive state.
//!
//! A send goes quota check -> store the user message -> touch the
//! conversation -> ask the coach -> store the reply. There is no transaction:
//! if the reply fails, the user message stays and the caller gets it back in
//! the error so it can offer a retry.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

use coachly_types::coach::Coach;
use coachly_types::config::GlobalConfig;
use coachly_types::conversation::{Conversation, ConversationId, SessionKind};
use coachly_types::error::{SendError, SessionError, SessionStep};
use coachly_types::message::{Message, SenderType};
use coachly_types::quota::{Entitlement, QuotaStatus};
use coachly_types::reply::{CoachReply, CoachReplyRequest, GenerationError, VideoConversation};

use super::log::MessageLog;
use crate::feed::MessageSubscription;
use crate::generation::reply::CoachReplyService;
use crate::quota::QuotaGate;
use crate::repository::coach::CoachRepository;
use crate::repository::conversation::ConversationRepository;
use crate::repository::message::MessageRepository;

/// Utterance sent on behalf of the user when joining a video session.
pub const VIDEO_OPENER: &str = "Start coaching session";

/// Tunables for a chat controller.
#[derive(Debug, Clone, Copy)]
pub struct ChatSettings {
    pub gate: QuotaGate,
    /// Prior messages sent along with each reply request.
    pub history_window: usize,
}

impl ChatSettings {
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            gate: QuotaGate::new(config.free_message_limit),
            history_window: config.history_window,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&GlobalConfig::default())
    }
}

/// A completed send: the stored user message and the stored coach reply.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub user_message: Message,
    pub reply: Message,
}

/// Clears the busy flag when the send settles, however it ends.
struct SendGuard<'a>(&'a AtomicBool);

impl<'a> SendGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-conversation chat state.
///
/// At most one send is in flight at a time; a second concurrent send is
/// rejected, not queued. Messages from the send path and the live feed merge
/// into one log, deduplicated by id.
pub struct ChatController<C, M, R>
where
    C: ConversationRepository,
    M: MessageRepository,
    R: CoachReplyService,
{
    conversations: C,
    messages: M,
    replies: R,
    settings: ChatSettings,
    conversation: Conversation,
    coach: Coach,
    log: RwLock<MessageLog>,
    sending: AtomicBool,
}

impl<C, M, R> ChatController<C, M, R>
where
    C: ConversationRepository,
    M: MessageRepository,
    R: CoachReplyService,
{
    /// Load a conversation, its coach, and its messages.
    pub async fn open<K: CoachRepository>(
        conversations: C,
        messages: M,
        coaches: &K,
        replies: R,
        settings: ChatSettings,
        conversation_id: &ConversationId,
    ) -> Result<Self, SessionError> {
        let conversation = conversations
            .get(conversation_id)
            .await
            .map_err(SessionError::storage(SessionStep::LoadConversation))?
            .ok_or(SessionError::ConversationNotFound)?;
        let coach = coaches
            .get_by_id(&conversation.coach_id)
            .await
            .map_err(SessionError::storage(SessionStep::LoadCoach))?
            .ok_or(SessionError::CoachNotFound)?;
        let stored = messages
            .list(conversation_id, None)
            .await
            .map_err(SessionError::storage(SessionStep::LoadConversation))?;
        let user_messages = messages
            .count(conversation_id, Some(SenderType::User))
            .await
            .map_err(SessionError::storage(SessionStep::LoadConversation))?;

        tracing::debug!(
            conversation_id = %conversation_id,
            messages = stored.len(),
            user_messages,
            "chat opened"
        );

        Ok(Self {
            conversations,
            messages,
            replies,
            settings,
            conversation,
            coach,
            log: RwLock::new(MessageLog::new(stored).with_user_count(user_messages)),
            sending: AtomicBool::new(false),
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn coach(&self) -> &Coach {
        &self.coach
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Snapshot of the log in display order.
    pub async fn messages(&self) -> Vec<Message> {
        self.log.read().await.messages().to_vec()
    }

    pub async fn quota(&self, entitlement: Entitlement) -> QuotaStatus {
        let count = self.log.read().await.user_message_count();
        self.settings.gate.status(count, entitlement)
    }

    /// Send a user message and store the coach's reply.
    pub async fn send_message(
        &self,
        text: &str,
        entitlement: Entitlement,
    ) -> Result<Exchange, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::EmptyMessage);
        }
        let _guard = SendGuard::acquire(&self.sending).ok_or(SendError::SendInFlight)?;

        let count = self.log.read().await.user_message_count();
        let gate = self.settings.gate;
        if !gate.can_send(count, entitlement) {
            tracing::info!(
                conversation_id = %self.conversation.id,
                user_messages = count,
                limit = gate.limit(),
                "free message limit reached"
            );
            return Err(SendError::QuotaExceeded { limit: gate.limit() });
        }

        let user_message = self
            .messages
            .insert(&Message::new(self.conversation.id, SenderType::User, text))
            .await?;
        self.log.write().await.merge(user_message.clone());

        if let Err(e) = self
            .conversations
            .touch(&self.conversation.id, user_message.created_at)
            .await
        {
            tracing::warn!(
                conversation_id = %self.conversation.id,
                error = %e,
                "failed to update last message time"
            );
        }

        let reply = self.reply_to(&user_message).await?;
        Ok(Exchange {
            user_message,
            reply,
        })
    }

    /// Generate and store a reply for a trailing unanswered user message.
    pub async fn retry_reply(&self) -> Result<Message, SendError> {
        let _guard = SendGuard::acquire(&self.sending).ok_or(SendError::SendInFlight)?;
        let last = self.log.read().await.last().cloned();
        match last {
            Some(message) if message.is_from_user() => self.reply_to(&message).await,
            _ => Err(SendError::NothingToRetry),
        }
    }

    /// Merge a pushed message. Returns whether it was new.
    pub async fn merge_incoming(&self, message: Message) -> bool {
        if message.conversation_id != self.conversation.id {
            return false;
        }
        self.log.write().await.merge(message)
    }

    /// Merge every message from `subscription` until the feed closes.
    pub async fn follow(&self, mut subscription: MessageSubscription) {
        while let Some(message) = subscription.recv().await {
            let id = message.id;
            if self.merge_incoming(message).await {
                tracing::debug!(conversation_id = %self.conversation.id, message_id = %id, "merged pushed message");
            }
        }
    }

    /// Ask for a joinable live video session with this coach.
    pub async fn join_video(&self) -> Result<VideoConversation, GenerationError> {
        let request = CoachReplyRequest {
            transcript: Vec::new(),
            user_message: VIDEO_OPENER.to_string(),
            system_prompt: self.coach.system_prompt.clone(),
            kind: SessionKind::Video,
            video_persona_id: self.coach.video_persona_id.clone(),
        };
        match self.replies.reply(&request).await? {
            CoachReply::Video(video) => {
                tracing::info!(
                    conversation_id = %self.conversation.id,
                    video_conversation_id = %video.conversation_id,
                    "video session ready"
                );
                Ok(video)
            }
            CoachReply::Text { .. } => Err(GenerationError::UnexpectedReply(
                "text reply to a video join".into(),
            )),
        }
    }

    async fn reply_to(&self, user_message: &Message) -> Result<Message, SendError> {
        let transcript = self
            .log
            .read()
            .await
            .transcript_before(user_message.id, self.settings.history_window);
        let request = CoachReplyRequest {
            transcript,
            user_message: user_message.content.clone(),
            system_prompt: self.coach.system_prompt.clone(),
            kind: SessionKind::Text,
            video_persona_id: None,
        };

        let failed = |reason: GenerationError| {
            tracing::warn!(
                conversation_id = %self.conversation.id,
                message_id = %user_message.id,
                error = %reason,
                "coach reply failed"
            );
            SendError::ReplyFailed {
                user_message: Box::new(user_message.clone()),
                reason,
            }
        };

        let content = match self.replies.reply(&request).await {
            Ok(CoachReply::Text { content }) => content,
            Ok(CoachReply::Video(_)) => {
                return Err(failed(GenerationError::UnexpectedReply(
                    "video reply to a text message".into(),
                )));
            }
            Err(reason) => return Err(failed(reason)),
        };

        let reply = self
            .messages
            .insert(&Message::new(self.conversation.id, SenderType::Coach, content))
            .await
            .map_err(|source| SendError::ReplyNotStored {
                user_message: Box::new(user_message.clone()),
                source,
            })?;
        self.log.write().await.merge(reply.clone());
        Ok(reply)
    }
}
