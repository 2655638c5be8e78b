//! Per-conversation chat: message log, send orchestration, push merge.

pub mod controller;
pub mod log;
