//! HTTP request handlers for the REST API.

pub mod coach;
pub mod message;
pub mod session;
pub mod ws;
