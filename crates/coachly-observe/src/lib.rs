//! Observability for Coachly: subscriber setup and the GenAI attribute names
//! recorded on vendor call spans.

pub mod genai_attrs;
pub mod tracing_setup;
