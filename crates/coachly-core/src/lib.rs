//! Business logic and repository trait definitions for Coachly.
//!
//! This crate defines the "ports" (repository and vendor traits) that the
//! infrastructure layer implements. It depends only on `coachly-types` --
//! never on `coachly-infra` or any database/IO crate.

pub mod chat;
pub mod coach;
pub mod feed;
pub mod generation;
pub mod quota;
pub mod repository;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
