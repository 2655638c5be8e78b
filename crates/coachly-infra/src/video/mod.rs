//! Live video conversation providers.

pub mod tavus;

pub use tavus::TavusClient;
