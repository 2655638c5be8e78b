//! SQLite message repository implementation.
//!
//! Every successful insert is published on the shared [`MessageFeed`] after
//! the write commits, so subscribers never see a message that is not stored.

use sqlx::Row;
use uuid::Uuid;

use coachly_core::feed::MessageFeed;
use coachly_core::repository::message::MessageRepository;
use coachly_types::conversation::ConversationId;
use coachly_types::error::RepositoryError;
use coachly_types::message::{Message, SenderType};

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `MessageRepository`.
#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: DatabasePool,
    feed: MessageFeed,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool, feed: MessageFeed) -> Self {
        Self { pool, feed }
    }
}

struct MessageRow {
    id: String,
    conversation_id: String,
    sender: String,
    content: String,
    metadata: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sender: row.try_get("sender")?,
            content: row.try_get("content")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let conversation_id = self
            .conversation_id
            .parse::<ConversationId>()
            .map_err(|e| RepositoryError::Query(format!("invalid conversation id: {e}")))?;
        let sender: SenderType = self.sender.parse().map_err(RepositoryError::Query)?;
        let metadata: serde_json::Value = serde_json::from_str(&self.metadata)
            .map_err(|e| RepositoryError::Query(format!("invalid metadata JSON: {e}")))?;

        Ok(Message {
            id,
            conversation_id,
            sender,
            content: self.content,
            metadata,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl MessageRepository for SqliteMessageRepository {
    async fn insert(&self, message: &Message) -> Result<Message, RepositoryError> {
        let metadata = serde_json::to_string(&message.metadata)
            .map_err(|e| RepositoryError::Query(format!("failed to serialize metadata: {e}")))?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender, content, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.sender.to_string())
        .bind(&message.content)
        .bind(&metadata)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.message().contains("FOREIGN KEY") => {
                RepositoryError::Conflict(format!(
                    "conversation {} does not exist",
                    message.conversation_id
                ))
            }
            other => query_error(other),
        })?;

        self.feed.publish(message);
        Ok(message.clone())
    }

    async fn list(
        &self,
        conversation_id: &ConversationId,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut sql = String::from(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        );
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(conversation_id.to_string());
        if let Some(limit) = limit {
            query = query.bind(limit);
        }

        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;
        rows.iter()
            .map(|row| MessageRow::from_row(row).map_err(query_error)?.into_message())
            .collect()
    }

    async fn count(
        &self,
        conversation_id: &ConversationId,
        sender: Option<SenderType>,
    ) -> Result<u32, RepositoryError> {
        let count: i64 = match sender {
            Some(sender) => sqlx::query_scalar(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ? AND sender = ?",
            )
            .bind(conversation_id.to_string())
            .bind(sender.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_error)?,
            None => sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
                .bind(conversation_id.to_string())
                .fetch_one(&self.pool.reader)
                .await
                .map_err(query_error)?,
        };

        u32::try_from(count).map_err(|e| RepositoryError::Query(format!("invalid count: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::coach::SqliteCoachRepository;
    use crate::sqlite::coach::tests::make_coach;
    use crate::sqlite::conversation::SqliteConversationRepository;
    use crate::sqlite::test_support::test_pool;
    use chrono::{Duration, Utc};
    use coachly_core::repository::coach::CoachRepository;
    use coachly_core::repository::conversation::ConversationRepository;
    use coachly_types::conversation::{Conversation, SessionKey, SessionKind};
    use coachly_types::user::UserId;

    struct Fixture {
        messages: SqliteMessageRepository,
        coaches: SqliteCoachRepository,
        feed: MessageFeed,
        conversation: Conversation,
    }

    async fn setup() -> Fixture {
        let pool = test_pool().await;
        let feed = MessageFeed::default();
        let coaches = SqliteCoachRepository::new(pool.clone());
        let conversations = SqliteConversationRepository::new(pool.clone());

        let coach = make_coach("Sarah", UserId::new(), true);
        coaches.create(&coach).await.unwrap();
        let key = SessionKey::new(UserId::new(), coach.id, SessionKind::Text);
        let conversation = Conversation::new_active(key, 1, None);
        conversations.create(&conversation).await.unwrap();

        Fixture {
            messages: SqliteMessageRepository::new(pool, feed.clone()),
            coaches,
            feed,
            conversation,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_in_order() {
        let fx = setup().await;
        let conv = fx.conversation.id;
        let base = Utc::now();

        let mut late = Message::new(conv, SenderType::Coach, "Let's plan your week.");
        late.created_at = base + Duration::seconds(2);
        let mut early = Message::new(conv, SenderType::User, "I keep procrastinating.");
        early.created_at = base;
        fx.messages.insert(&late).await.unwrap();
        fx.messages.insert(&early).await.unwrap();

        let listed = fx.messages.list(&conv, None).await.unwrap();
        let contents: Vec<&str> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["I keep procrastinating.", "Let's plan your week."]);

        let capped = fx.messages.list(&conv, Some(1)).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, early.id);
    }

    #[tokio::test]
    async fn test_metadata_survives_storage() {
        let fx = setup().await;
        let recap = Message::new(fx.conversation.id, SenderType::Coach, "Welcome back!")
            .with_recap_flag();
        fx.messages.insert(&recap).await.unwrap();

        let listed = fx.messages.list(&fx.conversation.id, None).await.unwrap();
        assert!(listed[0].is_recap());
    }

    #[tokio::test]
    async fn test_count_by_sender() {
        let fx = setup().await;
        let conv = fx.conversation.id;
        for text in ["one", "two", "three"] {
            fx.messages
                .insert(&Message::new(conv, SenderType::User, text))
                .await
                .unwrap();
        }
        fx.messages
            .insert(&Message::new(conv, SenderType::Coach, "reply"))
            .await
            .unwrap();

        assert_eq!(fx.messages.count(&conv, None).await.unwrap(), 4);
        assert_eq!(fx.messages.count(&conv, Some(SenderType::User)).await.unwrap(), 3);
        assert_eq!(fx.messages.count(&conv, Some(SenderType::Coach)).await.unwrap(), 1);
        assert_eq!(fx.messages.count(&ConversationId::new(), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_publishes_to_feed() {
        let fx = setup().await;
        let mut sub = fx.feed.subscribe(fx.conversation.id);

        let msg = Message::new(fx.conversation.id, SenderType::User, "Hi Sarah");
        fx.messages.insert(&msg).await.unwrap();

        let received = sub.recv().await.unwrap();
        assert_eq!(received.id, msg.id);
    }

    #[tokio::test]
    async fn test_insert_into_missing_conversation_is_rejected() {
        let fx = setup().await;
        let mut sub = fx.feed.subscribe(fx.conversation.id);
        let orphan = Message::new(ConversationId::new(), SenderType::User, "hello?");

        let err = fx.messages.insert(&orphan).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Nothing was announced for the failed write.
        let ok = Message::new(fx.conversation.id, SenderType::User, "after");
        fx.messages.insert(&ok).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().id, ok.id);
    }

    #[tokio::test]
    async fn test_deleting_coach_removes_messages() {
        let fx = setup().await;
        let conv = fx.conversation.id;
        fx.messages
            .insert(&Message::new(conv, SenderType::User, "hello"))
            .await
            .unwrap();

        fx.coaches.delete(&fx.conversation.coach_id).await.unwrap();
        assert_eq!(fx.messages.count(&conv, None).await.unwrap(), 0);
    }
}
