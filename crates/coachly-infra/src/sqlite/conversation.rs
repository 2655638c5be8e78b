//! SQLite conversation repository implementation.

use chrono::{DateTime, Utc};
use sqlx::Row;

use coachly_core::repository::conversation::ConversationRepository;
use coachly_types::coach::CoachId;
use coachly_types::conversation::{
    Conversation, ConversationId, ConversationStatus, SessionKey, SessionKind,
};
use coachly_types::error::RepositoryError;
use coachly_types::user::UserId;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `ConversationRepository`.
#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn latest_for_key(
        &self,
        key: &SessionKey,
        status: Option<ConversationStatus>,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let mut sql = String::from(
            "SELECT * FROM conversations WHERE user_id = ? AND coach_id = ? AND session_kind = ?",
        );
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY session_number DESC, created_at DESC LIMIT 1");

        let mut query = sqlx::query(&sql)
            .bind(key.user_id.to_string())
            .bind(key.coach_id.to_string())
            .bind(key.kind.to_string());
        if let Some(status) = status {
            query = query.bind(status.to_string());
        }

        let row = query
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;
        row.map(|row| ConversationRow::from_row(&row).map_err(query_error)?.into_conversation())
            .transpose()
    }
}

struct ConversationRow {
    id: String,
    user_id: String,
    coach_id: String,
    title: String,
    session_kind: String,
    status: String,
    session_number: i64,
    session_summary: Option<String>,
    last_message_at: String,
    created_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            coach_id: row.try_get("coach_id")?,
            title: row.try_get("title")?,
            session_kind: row.try_get("session_kind")?,
            status: row.try_get("status")?,
            session_number: row.try_get("session_number")?,
            session_summary: row.try_get("session_summary")?,
            last_message_at: row.try_get("last_message_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        let id = self
            .id
            .parse::<ConversationId>()
            .map_err(|e| RepositoryError::Query(format!("invalid conversation id: {e}")))?;
        let user_id = self
            .user_id
            .parse::<UserId>()
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
        let coach_id = self
            .coach_id
            .parse::<CoachId>()
            .map_err(|e| RepositoryError::Query(format!("invalid coach id: {e}")))?;
        let kind: SessionKind = self.session_kind.parse().map_err(RepositoryError::Query)?;
        let status: ConversationStatus = self.status.parse().map_err(RepositoryError::Query)?;
        let session_number = u32::try_from(self.session_number)
            .map_err(|e| RepositoryError::Query(format!("invalid session number: {e}")))?;

        Ok(Conversation {
            id,
            user_id,
            coach_id,
            title: self.title,
            kind,
            status,
            session_number,
            session_summary: self.session_summary,
            last_message_at: parse_datetime(&self.last_message_at)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl ConversationRepository for SqliteConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<Conversation, RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (id, user_id, coach_id, title, session_kind, status, session_number, session_summary, last_message_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(conversation.id.to_string())
        .bind(conversation.user_id.to_string())
        .bind(conversation.coach_id.to_string())
        .bind(&conversation.title)
        .bind(conversation.kind.to_string())
        .bind(conversation.status.to_string())
        .bind(i64::from(conversation.session_number))
        .bind(&conversation.session_summary)
        .bind(format_datetime(&conversation.last_message_at))
        .bind(format_datetime(&conversation.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(conversation.clone())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;
        row.map(|row| ConversationRow::from_row(&row).map_err(query_error)?.into_conversation())
            .transpose()
    }

    async fn find_active(&self, key: &SessionKey) -> Result<Option<Conversation>, RepositoryError> {
        self.latest_for_key(key, Some(ConversationStatus::Active)).await
    }

    async fn find_latest(&self, key: &SessionKey) -> Result<Option<Conversation>, RepositoryError> {
        self.latest_for_key(key, None).await
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        kind: Option<SessionKind>,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let mut sql = String::from("SELECT * FROM conversations WHERE user_id = ?");
        if kind.is_some() {
            sql.push_str(" AND session_kind = ?");
        }
        sql.push_str(" ORDER BY last_message_at DESC, session_number DESC");

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        if let Some(kind) = kind {
            query = query.bind(kind.to_string());
        }

        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;
        rows.iter()
            .map(|row| ConversationRow::from_row(row).map_err(query_error)?.into_conversation())
            .collect()
    }

    async fn update_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn touch(&self, id: &ConversationId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET last_message_at = ? WHERE id = ?")
            .bind(format_datetime(&at))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::coach::SqliteCoachRepository;
    use crate::sqlite::coach::tests::make_coach;
    use crate::sqlite::test_support::test_pool;
    use chrono::Duration;
    use coachly_core::repository::coach::CoachRepository;

    async fn setup() -> (SqliteConversationRepository, SqliteCoachRepository, SessionKey) {
        let pool = test_pool().await;
        let coaches = SqliteCoachRepository::new(pool.clone());
        let coach = make_coach("Sarah", UserId::new(), true);
        coaches.create(&coach).await.unwrap();
        let key = SessionKey::new(UserId::new(), coach.id, SessionKind::Text);
        (SqliteConversationRepository::new(pool), coaches, key)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, _, key) = setup().await;
        let conv = Conversation::new_active(key, 1, Some("Discussed morning routines.".into()));
        repo.create(&conv).await.unwrap();

        let found = repo.get(&conv.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Session 1");
        assert_eq!(found.kind, SessionKind::Text);
        assert_eq!(found.status, ConversationStatus::Active);
        assert_eq!(found.session_summary.as_deref(), Some("Discussed morning routines."));
        assert_eq!(found.created_at, conv.created_at);
    }

    #[tokio::test]
    async fn test_find_latest_ignores_status_and_kind() {
        let (repo, _, key) = setup().await;
        let mut first = Conversation::new_active(key, 1, None);
        first.status = ConversationStatus::Archived;
        let mut second = Conversation::new_active(key, 2, None);
        second.status = ConversationStatus::Archived;
        let video = Conversation::new_active(SessionKey { kind: SessionKind::Video, ..key }, 7, None);
        for c in [&first, &second, &video] {
            repo.create(c).await.unwrap();
        }

        let latest = repo.find_latest(&key).await.unwrap().unwrap();
        assert_eq!(latest.session_number, 2);
        assert!(repo.find_active(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_active_and_archive() {
        let (repo, _, key) = setup().await;
        let conv = Conversation::new_active(key, 1, None);
        repo.create(&conv).await.unwrap();
        assert_eq!(repo.find_active(&key).await.unwrap().unwrap().id, conv.id);

        repo.update_status(&conv.id, ConversationStatus::Archived).await.unwrap();
        assert!(repo.find_active(&key).await.unwrap().is_none());
        assert!(matches!(
            repo.update_status(&ConversationId::new(), ConversationStatus::Archived).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_for_user_orders_by_last_message() {
        let (repo, _, key) = setup().await;
        let older = Conversation::new_active(key, 1, None);
        let newer = Conversation::new_active(key, 2, None);
        repo.create(&older).await.unwrap();
        repo.create(&newer).await.unwrap();
        repo.touch(&older.id, Utc::now() + Duration::minutes(5)).await.unwrap();

        let list = repo.list_for_user(&key.user_id, Some(SessionKind::Text)).await.unwrap();
        let numbers: Vec<u32> = list.iter().map(|c| c.session_number).collect();
        assert_eq!(numbers, vec![1, 2]);

        assert!(repo.list_for_user(&key.user_id, Some(SessionKind::Video)).await.unwrap().is_empty());
        assert!(repo.list_for_user(&UserId::new(), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_coach_cascades() {
        let (repo, coaches, key) = setup().await;
        let conv = Conversation::new_active(key, 1, None);
        repo.create(&conv).await.unwrap();

        coaches.delete(&key.coach_id).await.unwrap();
        assert!(repo.get(&conv.id).await.unwrap().is_none());
    }
}
