//! Coach repository trait definition.

use coachly_types::coach::{Coach, CoachId};
use coachly_types::error::RepositoryError;
use coachly_types::user::UserId;

use super::SortOrder;

/// Column a coach listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoachSort {
    #[default]
    CreatedAt,
    UseCount,
}

/// Filter criteria for listing coaches.
#[derive(Debug, Clone, Default)]
pub struct CoachFilter {
    /// Only public (`Some(true)`) or only private (`Some(false)`) coaches.
    pub is_public: Option<bool>,
    /// Only coaches authored by this user.
    pub creator_id: Option<UserId>,
    pub sort_by: CoachSort,
    pub sort_order: SortOrder,
    pub limit: Option<i64>,
}

/// Repository trait for coach persistence.
///
/// Implementations live in coachly-infra (e.g., `SqliteCoachRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait CoachRepository: Send + Sync {
    /// Create a new coach. Returns the created coach.
    fn create(
        &self,
        coach: &Coach,
    ) -> impl std::future::Future<Output = Result<Coach, RepositoryError>> + Send;

    /// Get a coach by its unique ID.
    fn get_by_id(
        &self,
        id: &CoachId,
    ) -> impl std::future::Future<Output = Result<Option<Coach>, RepositoryError>> + Send;

    /// List coaches with optional filtering and sorting.
    fn list(
        &self,
        filter: &CoachFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Coach>, RepositoryError>> + Send;

    /// Update an existing coach. Returns the updated coach.
    fn update(
        &self,
        coach: &Coach,
    ) -> impl std::future::Future<Output = Result<Coach, RepositoryError>> + Send;

    /// Permanently delete a coach. Its conversations and messages go with it.
    fn delete(
        &self,
        id: &CoachId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Bump the usage counter by one, in a single store statement.
    fn increment_use_count(
        &self,
        id: &CoachId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
