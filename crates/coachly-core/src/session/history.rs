//! Per-coach grouping of a user's session history.

use serde::Serialize;

use coachly_types::coach::CoachId;
use coachly_types::conversation::Conversation;

/// A user's sessions with one coach, most recently active first.
#[derive(Debug, Clone, Serialize)]
pub struct CoachSessions {
    pub coach_id: CoachId,
    /// The open session, if any.
    pub active: Option<Conversation>,
    /// Every session with this coach, the active one included.
    pub sessions: Vec<Conversation>,
}

/// Group conversations by coach, keeping input order both across groups
/// (first appearance) and within each group.
pub fn group_by_coach(conversations: Vec<Conversation>) -> Vec<CoachSessions> {
    let mut groups: Vec<CoachSessions> = Vec::new();
    for conversation in conversations {
        let idx = match groups.iter().position(|g| g.coach_id == conversation.coach_id) {
            Some(idx) => idx,
            None => {
                groups.push(CoachSessions {
                    coach_id: conversation.coach_id,
                    active: None,
                    sessions: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[idx];
        if conversation.is_active() && group.active.is_none() {
            group.active = Some(conversation.clone());
        }
        group.sessions.push(conversation);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use coachly_types::conversation::{ConversationStatus, SessionKey, SessionKind};
    use coachly_types::user::UserId;

    #[test]
    fn groups_preserve_order() {
        let user = UserId::new();
        let sarah = CoachId::new();
        let marcus = CoachId::new();

        let mut s1 = Conversation::new_active(SessionKey::new(user, sarah, SessionKind::Text), 1, None);
        s1.status = ConversationStatus::Archived;
        let s2 = Conversation::new_active(SessionKey::new(user, sarah, SessionKind::Text), 2, None);
        let m1 = Conversation::new_active(SessionKey::new(user, marcus, SessionKind::Text), 1, None);

        let groups = group_by_coach(vec![s2.clone(), m1.clone(), s1.clone()]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].coach_id, sarah);
        assert_eq!(groups[0].active.as_ref().unwrap().id, s2.id);
        let numbers: Vec<u32> = groups[0].sessions.iter().map(|c| c.session_number).collect();
        assert_eq!(numbers, vec![2, 1]);
        assert_eq!(groups[1].coach_id, marcus);
        assert_eq!(groups[1].sessions.len(), 1);
    }

    #[test]
    fn group_without_active_session() {
        let mut c = Conversation::new_active(
            SessionKey::new(UserId::new(), CoachId::new(), SessionKind::Text),
            1,
            None,
        );
        c.status = ConversationStatus::Archived;
        let groups = group_by_coach(vec![c]);
        assert!(groups[0].active.is_none());
    }
}
