//! Local, deduplicated view of a conversation's messages.
//!
//! Messages arrive from two places: the send path (after a successful
//! insert) and the live feed. Both merge here by message id, so whichever
//! arrives second is dropped.

use std::collections::HashSet;

use uuid::Uuid;

use coachly_types::llm::LlmMessage;
use coachly_types::message::{Message, SenderType};

#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    seen: HashSet<Uuid>,
    user_messages: u32,
}

impl MessageLog {
    /// Build a log from stored messages (any order; duplicates dropped).
    pub fn new(messages: Vec<Message>) -> Self {
        let mut log = Self::default();
        for message in messages {
            log.merge(message);
        }
        log
    }

    /// Start the user-message counter from the store's count. The counter
    /// never drops below what has been merged.
    pub fn with_user_count(mut self, stored: u32) -> Self {
        self.user_messages = self.user_messages.max(stored);
        self
    }

    /// Add a message unless its id is already present. Keeps `created_at`
    /// order; ties keep arrival order. Returns whether it was added.
    pub fn merge(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        let at = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        if message.is_from_user() {
            self.user_messages += 1;
        }
        self.messages.insert(at, message);
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of user-authored messages; the quota counts these.
    pub fn user_message_count(&self) -> u32 {
        self.user_messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Up to `window` messages immediately preceding message `id`, oldest
    /// first, as LLM turns. Empty if `id` is unknown.
    pub fn transcript_before(&self, id: Uuid, window: usize) -> Vec<LlmMessage> {
        let Some(end) = self.messages.iter().position(|m| m.id == id) else {
            return Vec::new();
        };
        let start = end.saturating_sub(window);
        self.messages[start..end]
            .iter()
            .map(|m| match m.sender {
                SenderType::User => LlmMessage::user(m.content.clone()),
                SenderType::Coach => LlmMessage::assistant(m.content.clone()),
            })
            .collect()
    }
}
