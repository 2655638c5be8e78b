//! Live message feed.
//!
//! Every message the store accepts is published on a single
//! `tokio::sync::broadcast` channel. Chat views subscribe per conversation
//! and only see inserts for that conversation. Publishing with no
//! subscribers is a no-op.

use coachly_types::conversation::ConversationId;
use coachly_types::message::Message;
use tokio::sync::broadcast;

/// Default channel capacity.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Multi-consumer feed of inserted messages.
///
/// Cloning the feed clones the sender, so a repository and the API state can
/// share one channel.
#[derive(Clone)]
pub struct MessageFeed {
    sender: broadcast::Sender<Message>,
}

impl MessageFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Announce a stored message to current subscribers.
    pub fn publish(&self, message: &Message) {
        let _ = self.sender.send(message.clone());
    }

    /// Subscribe to future inserts for one conversation.
    pub fn subscribe(&self, conversation_id: ConversationId) -> MessageSubscription {
        MessageSubscription {
            conversation_id,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl std::fmt::Debug for MessageFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageFeed")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

/// A conversation-scoped receiver on the [`MessageFeed`].
pub struct MessageSubscription {
    conversation_id: ConversationId,
    receiver: broadcast::Receiver<Message>,
}

impl MessageSubscription {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Wait for the next message inserted into this conversation.
    ///
    /// Returns `None` once the feed is closed. A lagging subscriber skips the
    /// overwritten messages with a warning and keeps receiving.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if message.conversation_id == self.conversation_id => {
                    return Some(message);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        conversation_id = %self.conversation_id,
                        skipped = n,
                        "message feed subscriber lagged, skipping {n} messages"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coachly_types::message::SenderType;

    #[tokio::test]
    async fn subscription_only_sees_its_conversation() {
        let feed = MessageFeed::new(16);
        let mine = ConversationId::new();
        let other = ConversationId::new();
        let mut sub = feed.subscribe(mine);

        feed.publish(&Message::new(other, SenderType::User, "not for you"));
        let expected = Message::new(mine, SenderType::Coach, "hello");
        feed.publish(&expected);

        let received = sub.recv().await.unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let feed = MessageFeed::default();
        feed.publish(&Message::new(ConversationId::new(), SenderType::User, "hi"));
    }

    #[tokio::test]
    async fn lagged_subscriber_keeps_receiving() {
        let feed = MessageFeed::new(4);
        let conv = ConversationId::new();
        let mut sub = feed.subscribe(conv);

        for i in 0..10 {
            feed.publish(&Message::new(conv, SenderType::User, format!("m{i}")));
        }

        let received = sub.recv().await.unwrap();
        assert_eq!(received.content, "m6");
    }

    #[tokio::test]
    async fn closed_feed_ends_subscription() {
        let feed = MessageFeed::new(4);
        let mut sub = feed.subscribe(ConversationId::new());
        drop(feed);
        assert!(sub.recv().await.is_none());
    }
}
