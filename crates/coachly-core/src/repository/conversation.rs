//! ConversationRepository trait definition.

use chrono::{DateTime, Utc};

use coachly_types::conversation::{
    Conversation, ConversationId, ConversationStatus, SessionKey, SessionKind,
};
use coachly_types::error::RepositoryError;
use coachly_types::user::UserId;

/// Repository trait for coaching session persistence.
///
/// Nothing here enforces "one active conversation per key". The lifecycle
/// manager maintains that by archiving before it creates.
pub trait ConversationRepository: Send + Sync {
    fn create(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    fn get(
        &self,
        id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// The active conversation for a key. If a race left several, the one
    /// with the highest session number.
    fn find_active(
        &self,
        key: &SessionKey,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Highest-numbered conversation for a key, whatever its status.
    fn find_latest(
        &self,
        key: &SessionKey,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Conversations of a user ordered by `last_message_at` DESC.
    fn list_for_user(
        &self,
        user_id: &UserId,
        kind: Option<SessionKind>,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    fn update_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Set `last_message_at`.
    fn touch(
        &self,
        id: &ConversationId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
