//! Free-tier message quota types.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// User messages allowed per conversation without a premium entitlement.
pub const FREE_MESSAGE_LIMIT: u32 = 10;

/// Percentage of the free allotment at which the upsell warning starts.
pub const APPROACHING_PERCENT: u32 = 80;

/// Subscription entitlement, resolved by the external subscription layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entitlement {
    #[default]
    Free,
    Premium,
}

impl Entitlement {
    pub fn is_premium(self) -> bool {
        self == Entitlement::Premium
    }
}

impl From<bool> for Entitlement {
    fn from(is_premium: bool) -> Self {
        if is_premium {
            Entitlement::Premium
        } else {
            Entitlement::Free
        }
    }
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entitlement::Free => write!(f, "free"),
            Entitlement::Premium => write!(f, "premium"),
        }
    }
}

impl FromStr for Entitlement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Entitlement::Free),
            "premium" => Ok(Entitlement::Premium),
            other => Err(format!("invalid entitlement: '{other}'")),
        }
    }
}

/// Upsell prompt level. Informational only; sends are blocked by `can_send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaWarning {
    None,
    Approaching,
    Blocked,
}

/// Snapshot of a conversation's quota, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub user_messages: u32,
    pub limit: u32,
    /// `None` for premium users.
    pub remaining: Option<u32>,
    pub can_send: bool,
    pub warning: QuotaWarning,
}
