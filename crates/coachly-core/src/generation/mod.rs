//! Vendor-backed generation: coach replies, session recaps, video joins.
//!
//! `provider` holds the raw vendor ports implemented in coachly-infra;
//! `reply` and `summary` build the coaching capabilities on top of them.

pub mod provider;
pub mod reply;
pub mod summary;
