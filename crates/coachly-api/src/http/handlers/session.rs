//! Session lifecycle HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions                        - Begin a session (may offer a recap)
//! - POST /api/v1/sessions/pending/{id}/resolve   - Accept or decline a recap offer
//! - GET  /api/v1/sessions                        - The caller's sessions grouped by coach
//! - GET  /api/v1/sessions/{id}                   - Get a session
//! - POST /api/v1/sessions/{id}/end               - Archive a session

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coachly_core::session::history::CoachSessions;
use coachly_core::session::lifecycle::{
    PendingSession, RecapDecision, RecapResolution, SessionStart, StartedSession,
};
use coachly_types::coach::CoachId;
use coachly_types::conversation::{Conversation, ConversationId, SessionKind};
use coachly_types::error::SessionError;

use crate::http::error::AppError;
use crate::http::extractors::caller::Caller;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BeginSessionRequest {
    pub coach_id: CoachId,
    #[serde(default)]
    pub kind: SessionKind,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRecapRequest {
    pub decision: RecapDecision,
}

#[derive(Debug, Deserialize, Default)]
pub struct SessionListQuery {
    pub kind: Option<SessionKind>,
}

/// Outcome of resolving a recap offer.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveOutcome {
    Started(StartedSession),
    /// The offer is still pending; resolve again, usually with `decline`.
    SummaryUnavailable {
        pending: PendingSession,
        reason: String,
    },
}

pub(crate) fn parse_conversation_id(s: &str) -> Result<ConversationId, AppError> {
    s.parse::<ConversationId>()
        .map_err(|_| AppError::Validation(format!("Invalid session id: {s}")))
}

/// Load a session the caller owns. Other users' sessions read as not found.
pub(crate) async fn owned_session(
    state: &AppState,
    caller: &Caller,
    id: &str,
) -> Result<Conversation, AppError> {
    let id = parse_conversation_id(id)?;
    let conversation = state.session_manager.get_session(&id).await?;
    if conversation.user_id != caller.user_id {
        return Err(SessionError::ConversationNotFound.into());
    }
    Ok(conversation)
}

fn messages_link(id: &ConversationId) -> String {
    format!("/api/v1/sessions/{id}/messages")
}

/// POST /api/v1/sessions
pub async fn begin_session(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<BeginSessionRequest>,
) -> Result<ApiResponse<SessionStart>, AppError> {
    let start = Instant::now();
    let outcome = state
        .session_manager
        .begin_session(caller.user_id, request.coach_id, request.kind)
        .await?;

    if let Some(archived) = match &outcome {
        SessionStart::Started(started) => started.archived,
        SessionStart::RecapOffered(pending) => pending.archived,
    } {
        state.close_chat(&archived);
    }

    let (rel, link) = match &outcome {
        SessionStart::Started(started) => ("messages", messages_link(&started.conversation.id)),
        SessionStart::RecapOffered(pending) => {
            state.park_offer(pending.clone());
            ("resolve", format!("/api/v1/sessions/pending/{}/resolve", pending.id))
        }
    };
    Ok(ApiResponse::success(outcome, start).with_link(rel, link).created())
}

/// POST /api/v1/sessions/pending/{id}/resolve
pub async fn resolve_recap(
    State(state): State<AppState>,
    caller: Caller,
    Path(pending_id): Path<String>,
    Json(request): Json<ResolveRecapRequest>,
) -> Result<ApiResponse<ResolveOutcome>, AppError> {
    let start = Instant::now();
    let pending_id = pending_id
        .parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid pending session id: {pending_id}")))?;

    let pending = state
        .take_offer(&pending_id, &caller.user_id)
        .ok_or_else(|| AppError::NotFound("No pending recap offer with this id".to_string()))?;

    match state
        .session_manager
        .resolve_recap(pending, request.decision)
        .await?
    {
        RecapResolution::Started(started) => {
            let link = messages_link(&started.conversation.id);
            Ok(ApiResponse::success(ResolveOutcome::Started(started), start)
                .with_link("messages", link)
                .created())
        }
        RecapResolution::SummaryUnavailable { pending, reason } => {
            state.park_offer(pending.clone());
            let link = format!("/api/v1/sessions/pending/{}/resolve", pending.id);
            Ok(ApiResponse::success(
                ResolveOutcome::SummaryUnavailable {
                    pending,
                    reason: reason.to_string(),
                },
                start,
            )
            .with_link("resolve", link))
        }
    }
}

/// GET /api/v1/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<SessionListQuery>,
) -> Result<ApiResponse<Vec<CoachSessions>>, AppError> {
    let start = Instant::now();
    let sessions = state
        .session_manager
        .list_sessions(&caller.user_id, query.kind)
        .await?;
    Ok(ApiResponse::success(sessions, start).with_link("self", "/api/v1/sessions"))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<ApiResponse<Conversation>, AppError> {
    let start = Instant::now();
    let conversation = owned_session(&state, &caller, &id).await?;
    let link = messages_link(&conversation.id);
    Ok(ApiResponse::success(conversation, start).with_link("messages", link))
}

/// POST /api/v1/sessions/{id}/end
pub async fn end_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<ApiResponse<Conversation>, AppError> {
    let start = Instant::now();
    let conversation = owned_session(&state, &caller, &id).await?;
    let ended = state.session_manager.end_session(&conversation.id).await?;
    state.close_chat(&ended.id);
    Ok(ApiResponse::success(ended, start))
}
