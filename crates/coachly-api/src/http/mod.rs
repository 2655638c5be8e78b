//! HTTP/REST API layer for Coachly.
//!
//! Axum-based REST API at `/api/v1/` with caller identity headers, envelope
//! response format, CORS, and a WebSocket message feed.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
