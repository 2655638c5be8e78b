//! Coach catalogue.

pub mod service;
