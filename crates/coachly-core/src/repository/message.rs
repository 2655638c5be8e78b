//! MessageRepository trait definition.

use coachly_types::conversation::ConversationId;
use coachly_types::error::RepositoryError;
use coachly_types::message::{Message, SenderType};

/// Repository trait for chat message persistence.
///
/// Implementations are expected to announce every successful insert on the
/// [`MessageFeed`](crate::feed::MessageFeed) they were built with.
pub trait MessageRepository: Send + Sync {
    /// Save a new message. Returns the stored row.
    fn insert(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// Messages of a conversation ordered by `created_at` ASC, optionally
    /// capped to the first `limit`.
    fn list(
        &self,
        conversation_id: &ConversationId,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Number of messages in a conversation, optionally from one sender only.
    fn count(
        &self,
        conversation_id: &ConversationId,
        sender: Option<SenderType>,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;
}
