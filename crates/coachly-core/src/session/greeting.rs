//! Seed greetings for new sessions.

use coachly_types::coach::Coach;
use coachly_types::conversation::ConversationId;
use coachly_types::message::{Message, SenderType};

/// Opening line when no recap was carried over.
pub fn generic_greeting(coach: &Coach) -> String {
    format!(
        "Hello! I'm {}, your {}. {} How can I help you today?",
        coach.name,
        coach.title.to_lowercase(),
        coach.description
    )
}

/// Opening line built around an accepted recap.
pub fn recap_greeting(summary: &str) -> String {
    format!(
        "Welcome back! Based on our last session:\n\n{summary}\n\n\
         I'm ready to continue our journey together. What would you like to focus on today?"
    )
}

/// The single coach message every new session starts with.
pub fn seed_message(conversation_id: ConversationId, coach: &Coach, summary: Option<&str>) -> Message {
    match summary {
        Some(summary) => {
            Message::new(conversation_id, SenderType::Coach, recap_greeting(summary)).with_recap_flag()
        }
        None => Message::new(conversation_id, SenderType::Coach, generic_greeting(coach)),
    }
}
