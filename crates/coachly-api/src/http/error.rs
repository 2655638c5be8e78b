//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use coachly_types::error::{CoachError, SendError, SessionError};
use coachly_types::reply::GenerationError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Coach(CoachError),
    Session(SessionError),
    Send(SendError),
    Generation(GenerationError),
    /// Missing or malformed caller identity.
    Unauthorized(String),
    Validation(String),
    NotFound(String),
}

impl From<CoachError> for AppError {
    fn from(e: CoachError) -> Self {
        AppError::Coach(e)
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl From<SendError> for AppError {
    fn from(e: SendError) -> Self {
        AppError::Send(e)
    }
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        AppError::Generation(e)
    }
}

impl AppError {
    /// Status, machine-readable code, and optional details for the envelope.
    fn parts(&self) -> (StatusCode, &'static str, Option<serde_json::Value>) {
        match self {
            AppError::Coach(CoachError::NotFound) => (StatusCode::NOT_FOUND, "COACH_NOT_FOUND", None),
            AppError::Coach(CoachError::MissingFields(_) | CoachError::MissingSpecialties) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None)
            }
            AppError::Coach(CoachError::NotCreator) => (StatusCode::FORBIDDEN, "FORBIDDEN", None),
            AppError::Coach(CoachError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", None)
            }

            AppError::Session(SessionError::CoachNotFound) => {
                (StatusCode::NOT_FOUND, "COACH_NOT_FOUND", None)
            }
            AppError::Session(SessionError::ConversationNotFound) => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", None)
            }
            AppError::Session(SessionError::VideoUnavailable { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VIDEO_UNAVAILABLE", None)
            }
            AppError::Session(SessionError::StaleOffer { .. }) => {
                (StatusCode::CONFLICT, "STALE_OFFER", None)
            }
            AppError::Session(SessionError::Storage { step, .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                Some(json!({ "step": step.to_string() })),
            ),
            AppError::Session(SessionError::Incomplete { conversation, step, .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SESSION_INCOMPLETE",
                Some(json!({ "step": step.to_string(), "conversation": conversation })),
            ),

            AppError::Send(SendError::EmptyMessage) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::Send(SendError::SendInFlight) => (StatusCode::CONFLICT, "SEND_IN_FLIGHT", None),
            AppError::Send(SendError::QuotaExceeded { limit }) => (
                StatusCode::PAYMENT_REQUIRED,
                "QUOTA_EXCEEDED",
                Some(json!({ "limit": limit, "paywall": true })),
            ),
            AppError::Send(SendError::NothingToRetry) => (StatusCode::CONFLICT, "NOTHING_TO_RETRY", None),
            AppError::Send(SendError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", None)
            }
            AppError::Send(SendError::ReplyFailed { user_message, .. }) => (
                StatusCode::BAD_GATEWAY,
                "REPLY_FAILED",
                Some(json!({ "user_message": user_message, "retryable": true })),
            ),
            AppError::Send(SendError::ReplyNotStored { user_message, .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "REPLY_NOT_STORED",
                Some(json!({ "user_message": user_message, "retryable": true })),
            ),

            AppError::Generation(GenerationError::MissingPersona) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VIDEO_UNAVAILABLE", None)
            }
            AppError::Generation(GenerationError::NotConfigured(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED", None)
            }
            AppError::Generation(_) => (StatusCode::BAD_GATEWAY, "VENDOR_ERROR", None),

            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Coach(e) => e.to_string(),
            AppError::Session(e) => e.to_string(),
            AppError::Send(e) => e.to_string(),
            AppError::Generation(e) => e.to_string(),
            AppError::Unauthorized(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(%status, code, error = %message, "request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::now_v7().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
                "details": details,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
