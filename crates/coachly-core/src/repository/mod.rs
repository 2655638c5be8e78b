//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (coachly-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod coach;
pub mod conversation;
pub mod message;

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword for this order.
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
