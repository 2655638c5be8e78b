//! Coach catalogue HTTP handlers.
//!
//! Endpoints:
//! - POST   /api/v1/coaches        - Create a coach
//! - GET    /api/v1/coaches        - Public coaches, most used first
//! - GET    /api/v1/coaches/mine   - The caller's private coaches, newest first
//! - GET    /api/v1/coaches/{id}   - Get a coach
//! - PUT    /api/v1/coaches/{id}   - Update a coach (creator only)
//! - DELETE /api/v1/coaches/{id}   - Delete a coach and its sessions (creator only)

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};

use coachly_types::coach::{Coach, CoachId, CreateCoachRequest, UpdateCoachRequest};

use crate::http::error::AppError;
use crate::http::extractors::caller::Caller;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub(crate) fn parse_coach_id(s: &str) -> Result<CoachId, AppError> {
    s.parse::<CoachId>()
        .map_err(|_| AppError::Validation(format!("Invalid coach id: {s}")))
}

/// POST /api/v1/coaches
pub async fn create_coach(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<CreateCoachRequest>,
) -> Result<ApiResponse<Coach>, AppError> {
    let start = Instant::now();
    let coach = state.coach_service.create_coach(caller.user_id, request).await?;
    let link = format!("/api/v1/coaches/{}", coach.id);
    Ok(ApiResponse::success(coach, start).with_link("self", link).created())
}

/// GET /api/v1/coaches
pub async fn list_public_coaches(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Coach>>, AppError> {
    let start = Instant::now();
    let coaches = state.coach_service.list_public().await?;
    Ok(ApiResponse::success(coaches, start).with_link("self", "/api/v1/coaches"))
}

/// GET /api/v1/coaches/mine
pub async fn list_my_coaches(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<ApiResponse<Vec<Coach>>, AppError> {
    let start = Instant::now();
    let coaches = state.coach_service.list_private(&caller.user_id).await?;
    Ok(ApiResponse::success(coaches, start).with_link("self", "/api/v1/coaches/mine"))
}

/// GET /api/v1/coaches/{id}
pub async fn get_coach(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<ApiResponse<Coach>, AppError> {
    let start = Instant::now();
    let id = parse_coach_id(&id)?;
    let coach = state.coach_service.get_visible(&caller.user_id, &id).await?;
    Ok(ApiResponse::success(coach, start)
        .with_link("self", format!("/api/v1/coaches/{id}"))
        .with_link("sessions", "/api/v1/sessions"))
}

/// PUT /api/v1/coaches/{id}
pub async fn update_coach(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(request): Json<UpdateCoachRequest>,
) -> Result<ApiResponse<Coach>, AppError> {
    let start = Instant::now();
    let id = parse_coach_id(&id)?;
    let coach = state
        .coach_service
        .update_coach(&caller.user_id, &id, request)
        .await?;
    Ok(ApiResponse::success(coach, start).with_link("self", format!("/api/v1/coaches/{id}")))
}

/// DELETE /api/v1/coaches/{id}
pub async fn delete_coach(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let id = parse_coach_id(&id)?;
    state.coach_service.delete_coach(&caller.user_id, &id).await?;
    tracing::info!(coach_id = %id, user_id = %caller.user_id, "coach deleted");
    Ok(ApiResponse::success(serde_json::json!({ "deleted": id.to_string() }), start))
}
