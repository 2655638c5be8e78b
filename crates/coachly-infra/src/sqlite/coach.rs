//! SQLite coach repository implementation.
//!
//! Implements `CoachRepository` from `coachly-core` using sqlx with split read/write pools.

use coachly_core::repository::coach::{CoachFilter, CoachRepository, CoachSort};
use coachly_types::coach::{Coach, CoachId};
use coachly_types::error::RepositoryError;
use coachly_types::user::UserId;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `CoachRepository`.
#[derive(Clone)]
pub struct SqliteCoachRepository {
    pool: DatabasePool,
}

impl SqliteCoachRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Coach.
struct CoachRow {
    id: String,
    creator_id: String,
    name: String,
    title: String,
    description: String,
    avatar_url: Option<String>,
    specialties: String,
    personality_traits: String,
    system_prompt: String,
    video_persona_id: Option<String>,
    is_public: bool,
    use_count: i64,
    created_at: String,
    updated_at: String,
}

impl CoachRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            creator_id: row.try_get("creator_id")?,
            name: row.try_get("name")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            avatar_url: row.try_get("avatar_url")?,
            specialties: row.try_get("specialties")?,
            personality_traits: row.try_get("personality_traits")?,
            system_prompt: row.try_get("system_prompt")?,
            video_persona_id: row.try_get("video_persona_id")?,
            is_public: row.try_get("is_public")?,
            use_count: row.try_get("use_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_coach(self) -> Result<Coach, RepositoryError> {
        let id = self
            .id
            .parse::<CoachId>()
            .map_err(|e| RepositoryError::Query(format!("invalid coach id: {e}")))?;
        let creator_id = self
            .creator_id
            .parse::<UserId>()
            .map_err(|e| RepositoryError::Query(format!("invalid creator id: {e}")))?;
        let specialties: Vec<String> = serde_json::from_str(&self.specialties)
            .map_err(|e| RepositoryError::Query(format!("invalid specialties JSON: {e}")))?;
        let personality_traits: Vec<String> = serde_json::from_str(&self.personality_traits)
            .map_err(|e| RepositoryError::Query(format!("invalid personality traits JSON: {e}")))?;

        Ok(Coach {
            id,
            creator_id,
            name: self.name,
            title: self.title,
            description: self.description,
            avatar_url: self.avatar_url,
            specialties,
            personality_traits,
            system_prompt: self.system_prompt,
            video_persona_id: self.video_persona_id,
            is_public: self.is_public,
            use_count: self.use_count,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn to_json(list: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(list).map_err(|e| RepositoryError::Query(e.to_string()))
}

impl CoachRepository for SqliteCoachRepository {
    async fn create(&self, coach: &Coach) -> Result<Coach, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO coaches (id, creator_id, name, title, description, avatar_url, specialties, personality_traits, system_prompt, video_persona_id, is_public, use_count, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(coach.id.to_string())
        .bind(coach.creator_id.to_string())
        .bind(&coach.name)
        .bind(&coach.title)
        .bind(&coach.description)
        .bind(&coach.avatar_url)
        .bind(to_json(&coach.specialties)?)
        .bind(to_json(&coach.personality_traits)?)
        .bind(&coach.system_prompt)
        .bind(&coach.video_persona_id)
        .bind(coach.is_public)
        .bind(coach.use_count)
        .bind(format_datetime(&coach.created_at))
        .bind(format_datetime(&coach.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(coach.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("coach '{}' already exists", coach.id)),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get_by_id(&self, id: &CoachId) -> Result<Option<Coach>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM coaches WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(CoachRow::from_row(&row).map_err(query_error)?.into_coach()?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &CoachFilter) -> Result<Vec<Coach>, RepositoryError> {
        let mut sql = String::from("SELECT * FROM coaches");
        let mut conditions: Vec<&str> = Vec::new();

        if filter.is_public.is_some() {
            conditions.push("is_public = ?");
        }
        if filter.creator_id.is_some() {
            conditions.push("creator_id = ?");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let column = match filter.sort_by {
            CoachSort::CreatedAt => "created_at",
            CoachSort::UseCount => "use_count",
        };
        let order = filter.sort_order.as_sql();
        sql.push_str(&format!(" ORDER BY {column} {order}, created_at {order}"));

        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut query = sqlx::query(&sql);
        if let Some(is_public) = filter.is_public {
            query = query.bind(is_public);
        }
        if let Some(creator_id) = filter.creator_id {
            query = query.bind(creator_id.to_string());
        }

        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|row| CoachRow::from_row(row).map_err(query_error)?.into_coach())
            .collect()
    }

    async fn update(&self, coach: &Coach) -> Result<Coach, RepositoryError> {
        let result = sqlx::query(
            "UPDATE coaches SET name = ?, title = ?, description = ?, avatar_url = ?, specialties = ?, personality_traits = ?, system_prompt = ?, video_persona_id = ?, is_public = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&coach.name)
        .bind(&coach.title)
        .bind(&coach.description)
        .bind(&coach.avatar_url)
        .bind(to_json(&coach.specialties)?)
        .bind(to_json(&coach.personality_traits)?)
        .bind(&coach.system_prompt)
        .bind(&coach.video_persona_id)
        .bind(coach.is_public)
        .bind(format_datetime(&coach.updated_at))
        .bind(coach.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(coach.clone())
    }

    async fn delete(&self, id: &CoachId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM coaches WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn increment_use_count(&self, id: &CoachId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE coaches SET use_count = use_count + 1 WHERE id = ?")
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
pub(crate) mod tests {
    use super::*;
    use crate::sqlite::test_support::test_pool;
    use chrono::{Duration, Utc};
    use coachly_core::repository::SortOrder;

    pub(crate) fn make_coach(name: &str, creator: UserId, is_public: bool) -> Coach {
        let now = Utc::now();
        Coach {
            id: CoachId::new(),
            creator_id: creator,
            name: name.to_string(),
            title: "Life Coach".to_string(),
            description: format!("{name} helps you grow."),
            avatar_url: None,
            specialties: vec!["mindset".to_string()],
            personality_traits: vec!["calm".to_string(), "direct".to_string()],
            system_prompt: format!("You are {name}."),
            video_persona_id: None,
            is_public,
            use_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_id() {
        let repo = SqliteCoachRepository::new(test_pool().await);
        let mut coach = make_coach("Sarah", UserId::new(), true);
        coach.video_persona_id = Some("r79e1c033f".to_string());

        repo.create(&coach).await.unwrap();
        let found = repo.get_by_id(&coach.id).await.unwrap().unwrap();

        assert_eq!(found.name, "Sarah");
        assert_eq!(found.creator_id, coach.creator_id);
        assert_eq!(found.personality_traits, vec!["calm", "direct"]);
        assert_eq!(found.video_persona_id.as_deref(), Some("r79e1c033f"));
        assert!(found.is_public);
        assert!(repo.get_by_id(&CoachId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_public_by_use_count() {
        let repo = SqliteCoachRepository::new(test_pool().await);
        let creator = UserId::new();
        let quiet = make_coach("Quiet", creator, true);
        let popular = make_coach("Popular", creator, true);
        let hidden = make_coach("Hidden", creator, false);
        for coach in [&quiet, &popular, &hidden] {
            repo.create(coach).await.unwrap();
        }
        repo.increment_use_count(&popular.id).await.unwrap();
        repo.increment_use_count(&popular.id).await.unwrap();

        let public = repo
            .list(&CoachFilter {
                is_public: Some(true),
                sort_by: CoachSort::UseCount,
                sort_order: SortOrder::Desc,
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = public.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Popular", "Quiet"]);
        assert_eq!(public[0].use_count, 2);
    }

    #[tokio::test]
    async fn test_list_private_for_creator() {
        let repo = SqliteCoachRepository::new(test_pool().await);
        let alice = UserId::new();
        let mut older = make_coach("Older", alice, false);
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = make_coach("Newer", alice, false);
        let other = make_coach("Other", UserId::new(), false);
        for coach in [&older, &newer, &other] {
            repo.create(coach).await.unwrap();
        }

        let mine = repo
            .list(&CoachFilter {
                is_public: Some(false),
                creator_id: Some(alice),
                sort_by: CoachSort::CreatedAt,
                sort_order: SortOrder::Desc,
                limit: Some(10),
            })
            .await
            .unwrap();
        let names: Vec<&str> = mine.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = SqliteCoachRepository::new(test_pool().await);
        let mut coach = make_coach("Sarah", UserId::new(), true);
        repo.create(&coach).await.unwrap();

        coach.title = "Sleep Coach".to_string();
        coach.specialties.push("sleep".to_string());
        repo.update(&coach).await.unwrap();
        let found = repo.get_by_id(&coach.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Sleep Coach");
        assert_eq!(found.specialties.len(), 2);

        repo.delete(&coach.id).await.unwrap();
        assert!(repo.get_by_id(&coach.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&coach.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_increment_missing_coach() {
        let repo = SqliteCoachRepository::new(test_pool().await);
        let err = repo.increment_use_count(&CoachId::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
