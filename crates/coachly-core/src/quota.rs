//! Free-tier message quota.
//!
//! The gate is a pure function of the conversation's user-message count and
//! the caller's entitlement. It never touches the store; rejection leaves
//! everything unchanged.

use coachly_types::quota::{
    APPROACHING_PERCENT, Entitlement, FREE_MESSAGE_LIMIT, QuotaStatus, QuotaWarning,
};

/// Per-conversation cap on user messages for non-premium users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaGate {
    limit: u32,
}

impl QuotaGate {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Premium users always may send; everyone else until the limit.
    pub fn can_send(&self, user_messages: u32, entitlement: Entitlement) -> bool {
        entitlement.is_premium() || user_messages < self.limit
    }

    /// Upsell level for display. Does not affect `can_send`.
    pub fn warning_level(&self, user_messages: u32, entitlement: Entitlement) -> QuotaWarning {
        if entitlement.is_premium() {
            return QuotaWarning::None;
        }
        if user_messages >= self.limit {
            QuotaWarning::Blocked
        } else if user_messages * 100 >= self.limit * APPROACHING_PERCENT {
            QuotaWarning::Approaching
        } else {
            QuotaWarning::None
        }
    }

    /// Messages left before the cap. `None` means unlimited.
    pub fn remaining(&self, user_messages: u32, entitlement: Entitlement) -> Option<u32> {
        if entitlement.is_premium() {
            None
        } else {
            Some(self.limit.saturating_sub(user_messages))
        }
    }

    pub fn status(&self, user_messages: u32, entitlement: Entitlement) -> QuotaStatus {
        QuotaStatus {
            user_messages,
            limit: self.limit,
            remaining: self.remaining(user_messages, entitlement),
            can_send: self.can_send(user_messages, entitlement),
            warning: self.warning_level(user_messages, entitlement),
        }
    }
}

impl Default for QuotaGate {
    fn default() -> Self {
        Self::new(FREE_MESSAGE_LIMIT)
    }
}
