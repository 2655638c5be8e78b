//! Session lifecycle manager.
//!
//! Starting a session for a `(user, coach, kind)` key runs a short sequence
//! of store writes with no transaction around it:
//!
//! 1. archive the currently active conversation for the key, if any
//! 2. find the highest-numbered conversation for the key (any status)
//! 3. number the new session one above it, or 1
//! 4. when a previous session exists, offer a recap and wait for the caller
//! 5. insert the conversation, seed its greeting, bump the coach's usage count
//!
//! Failures before the insert leave no new row; failures after it are
//! reported as [`SessionError::Incomplete`] carrying the created conversation.
//! A recap offer is re-checked when resolved: if the key's latest session is
//! no longer the one the offer was numbered after, it fails with
//! [`SessionError::StaleOffer`]. Two concurrent resolutions for the same key
//! can still both pass that check; nothing here serializes them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coachly_types::coach::{Coach, CoachId};
use coachly_types::conversation::{
    Conversation, ConversationId, ConversationStatus, SessionKey, SessionKind,
};
use coachly_types::error::{SessionError, SessionStep};
use coachly_types::message::Message;
use coachly_types::reply::GenerationError;
use coachly_types::user::UserId;

use super::greeting::seed_message;
use super::history::{CoachSessions, group_by_coach};
use crate::generation::summary::SummaryService;
use crate::repository::coach::CoachRepository;
use crate::repository::conversation::ConversationRepository;
use crate::repository::message::MessageRepository;

/// Number for the session following `prior`.
pub fn next_session_number(prior: Option<&Conversation>) -> u32 {
    prior.map_or(1, |p| p.session_number + 1)
}

/// Whether starting session `next` after `prior` should offer a recap.
pub fn recap_eligible(prior: Option<&Conversation>, next: u32) -> bool {
    prior.is_some() && next > 1
}

/// A freshly created session, ready for the chat view.
#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub conversation: Conversation,
    /// The coach's seed message.
    pub greeting: Message,
    /// Conversation archived to make room for this one.
    pub archived: Option<ConversationId>,
}

/// A session start waiting on the caller's recap decision. Nothing has been
/// created for it yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSession {
    /// Handle for callers that park the decision (e.g. over HTTP).
    pub id: Uuid,
    pub key: SessionKey,
    pub coach: Coach,
    pub session_number: u32,
    /// The conversation a recap would summarize.
    pub previous_session_id: ConversationId,
    pub archived: Option<ConversationId>,
}

/// Outcome of [`SessionLifecycleManager::begin_session`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStart {
    Started(StartedSession),
    RecapOffered(PendingSession),
}

/// The caller's answer to a recap offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecapDecision {
    Accept,
    Decline,
}

/// Outcome of [`SessionLifecycleManager::resolve_recap`].
#[derive(Debug)]
pub enum RecapResolution {
    Started(StartedSession),
    /// The recap could not be generated. The pending session is handed back
    /// so the caller can resolve it again, typically with `Decline`.
    SummaryUnavailable {
        pending: PendingSession,
        reason: GenerationError,
    },
}

/// Orchestrates session start, recap, end, and history.
///
/// Generic over the repository traits and the summary service so that
/// coachly-core never depends on coachly-infra.
pub struct SessionLifecycleManager<C, M, K, S>
where
    C: ConversationRepository,
    M: MessageRepository,
    K: CoachRepository,
    S: SummaryService,
{
    conversations: C,
    messages: M,
    coaches: K,
    summaries: S,
}

impl<C, M, K, S> SessionLifecycleManager<C, M, K, S>
where
    C: ConversationRepository,
    M: MessageRepository,
    K: CoachRepository,
    S: SummaryService,
{
    pub fn new(conversations: C, messages: M, coaches: K, summaries: S) -> Self {
        Self {
            conversations,
            messages,
            coaches,
            summaries,
        }
    }

    /// Start a new session for `(user, coach, kind)`.
    ///
    /// The coach is validated before any write. The active session for the
    /// key is archived, then either a session is created immediately (first
    /// session) or a recap is offered.
    pub async fn begin_session(
        &self,
        user_id: UserId,
        coach_id: CoachId,
        kind: SessionKind,
    ) -> Result<SessionStart, SessionError> {
        let coach = self
            .coaches
            .get_by_id(&coach_id)
            .await
            .map_err(SessionError::storage(SessionStep::LoadCoach))?
            .ok_or(SessionError::CoachNotFound)?;
        if !coach.visible_to(&user_id) {
            return Err(SessionError::CoachNotFound);
        }

        if kind == SessionKind::Video && !coach.supports_video() {
            return Err(SessionError::VideoUnavailable { kind });
        }

        let key = SessionKey::new(user_id, coach_id, kind);
        let archived = self.archive_active(&key).await?;

        let prior = self
            .conversations
            .find_latest(&key)
            .await
            .map_err(SessionError::storage(SessionStep::FindPrior))?;
        let next = next_session_number(prior.as_ref());

        match prior {
            Some(prior) if recap_eligible(Some(&prior), next) => {
                tracing::info!(
                    session_key = %key,
                    session_number = next,
                    previous_session_id = %prior.id,
                    "recap offered for new session"
                );
                Ok(SessionStart::RecapOffered(PendingSession {
                    id: Uuid::now_v7(),
                    key,
                    coach,
                    session_number: next,
                    previous_session_id: prior.id,
                    archived,
                }))
            }
            _ => {
                let mut started = self.create_session(&coach, key, next, None).await?;
                started.archived = archived;
                Ok(SessionStart::Started(started))
            }
        }
    }

    /// Resolve a recap offer.
    ///
    /// `Decline` creates the session without a summary. `Accept` asks the
    /// summary service first; if that fails nothing is created and the
    /// pending session comes back in `SummaryUnavailable`.
    pub async fn resolve_recap(
        &self,
        pending: PendingSession,
        decision: RecapDecision,
    ) -> Result<RecapResolution, SessionError> {
        self.ensure_offer_current(&pending).await?;

        let summary = match decision {
            RecapDecision::Decline => None,
            RecapDecision::Accept => {
                match self.summaries.summarize(&pending.previous_session_id).await {
                    Ok(summary) => Some(summary),
                    Err(reason) => {
                        tracing::warn!(
                            previous_session_id = %pending.previous_session_id,
                            error = %reason,
                            "recap unavailable"
                        );
                        return Ok(RecapResolution::SummaryUnavailable { pending, reason });
                    }
                }
            }
        };

        if summary.is_some() {
            // Another start may have landed while the summary was generated.
            self.ensure_offer_current(&pending).await?;
        }
        let archived = self.archive_active(&pending.key).await?.or(pending.archived);

        let mut started = self
            .create_session(&pending.coach, pending.key, pending.session_number, summary)
            .await?;
        started.archived = archived;
        Ok(RecapResolution::Started(started))
    }

    /// Fail with `StaleOffer` unless the offer's previous session is still the
    /// latest for its key.
    async fn ensure_offer_current(&self, pending: &PendingSession) -> Result<(), SessionError> {
        let latest = self
            .conversations
            .find_latest(&pending.key)
            .await
            .map_err(SessionError::storage(SessionStep::FindPrior))?;
        match latest {
            Some(latest) if latest.id == pending.previous_session_id => Ok(()),
            latest => {
                tracing::warn!(
                    session_key = %pending.key,
                    session_number = pending.session_number,
                    latest_session_number = latest.map(|c| c.session_number),
                    "recap offer is stale"
                );
                Err(SessionError::StaleOffer {
                    session_number: pending.session_number,
                })
            }
        }
    }

    /// Insert a numbered session, its seed greeting, and count the coach's use.
    pub async fn create_session(
        &self,
        coach: &Coach,
        key: SessionKey,
        session_number: u32,
        summary: Option<String>,
    ) -> Result<StartedSession, SessionError> {
        let conversation = Conversation::new_active(key, session_number, summary);
        let conversation = self
            .conversations
            .create(&conversation)
            .await
            .map_err(SessionError::storage(SessionStep::InsertConversation))?;

        let seed = seed_message(conversation.id, coach, conversation.session_summary.as_deref());
        let greeting = match self.messages.insert(&seed).await {
            Ok(greeting) => greeting,
            Err(source) => {
                return Err(SessionError::Incomplete {
                    conversation: Box::new(conversation),
                    step: SessionStep::SeedGreeting,
                    source,
                });
            }
        };

        if let Err(source) = self.coaches.increment_use_count(&coach.id).await {
            return Err(SessionError::Incomplete {
                conversation: Box::new(conversation),
                step: SessionStep::CountUsage,
                source,
            });
        }

        tracing::info!(
            conversation_id = %conversation.id,
            session_key = %key,
            session_number,
            recap = greeting.is_recap(),
            "session started"
        );

        Ok(StartedSession {
            conversation,
            greeting,
            archived: None,
        })
    }

    /// Archive a session. Ending an already archived session is a no-op.
    pub async fn end_session(&self, id: &ConversationId) -> Result<Conversation, SessionError> {
        let mut conversation = self.get_session(id).await?;
        if conversation.is_active() {
            self.conversations
                .update_status(id, ConversationStatus::Archived)
                .await
                .map_err(SessionError::storage(SessionStep::EndSession))?;
            conversation.status = ConversationStatus::Archived;
            tracing::info!(conversation_id = %id, "session ended");
        }
        Ok(conversation)
    }

    pub async fn get_session(&self, id: &ConversationId) -> Result<Conversation, SessionError> {
        self.conversations
            .get(id)
            .await
            .map_err(SessionError::storage(SessionStep::LoadConversation))?
            .ok_or(SessionError::ConversationNotFound)
    }

    /// A user's sessions grouped per coach, most recently active first.
    pub async fn list_sessions(
        &self,
        user_id: &UserId,
        kind: Option<SessionKind>,
    ) -> Result<Vec<CoachSessions>, SessionError> {
        let conversations = self
            .conversations
            .list_for_user(user_id, kind)
            .await
            .map_err(SessionError::storage(SessionStep::ListSessions))?;
        Ok(group_by_coach(conversations))
    }

    async fn archive_active(&self, key: &SessionKey) -> Result<Option<ConversationId>, SessionError> {
        let active = self
            .conversations
            .find_active(key)
            .await
            .map_err(SessionError::storage(SessionStep::ArchiveActive))?;
        let Some(active) = active else {
            return Ok(None);
        };
        self.conversations
            .update_status(&active.id, ConversationStatus::Archived)
            .await
            .map_err(SessionError::storage(SessionStep::ArchiveActive))?;
        tracing::debug!(conversation_id = %active.id, "archived active session");
        Ok(Some(active.id))
    }
}
