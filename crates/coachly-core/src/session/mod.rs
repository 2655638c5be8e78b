//! Coaching session lifecycle: numbering, archiving, recaps, greetings.

pub mod greeting;
pub mod history;
pub mod lifecycle;
