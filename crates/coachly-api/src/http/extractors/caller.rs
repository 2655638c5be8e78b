//! Caller identity extractor.
//!
//! Account management lives outside this service. The caller's user id comes
//! from `X-User-Id` and their plan from `X-Entitlement: premium|free`
//! (absent means free).

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

use coachly_types::quota::Entitlement;
use coachly_types::user::UserId;

use crate::http::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ENTITLEMENT_HEADER: &str = "x-entitlement";

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: UserId,
    pub entitlement: Entitlement,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid X-User-Id header encoding".to_string()))?;
    let user_id = raw
        .trim()
        .parse::<UserId>()
        .map_err(|_| AppError::Unauthorized(format!("Invalid user id: {raw}")))?;

    let entitlement = match headers.get(ENTITLEMENT_HEADER) {
        None => Entitlement::Free,
        Some(value) => match value.to_str().map(|v| v.trim().to_ascii_lowercase()) {
            Ok(v) if v == "premium" => Entitlement::Premium,
            Ok(v) if v == "free" || v.is_empty() => Entitlement::Free,
            _ => {
                return Err(AppError::Validation(
                    "X-Entitlement must be 'premium' or 'free'".to_string(),
                ));
            }
        },
    };

    Ok(Caller {
        user_id,
        entitlement,
    })
}
