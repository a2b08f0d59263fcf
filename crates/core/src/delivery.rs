//! Channel queue retry policy and state machine.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the repository layer and the queue processor. One policy applies to every
//! channel; email and push do not retry differently.

use chrono::Duration;

use crate::types::{StatusId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of automatic retries after the first attempt.
///
/// `retry_count` never exceeds this value: the failure that would push it
/// past the ceiling marks the entry `failed` instead.
pub const MAX_RETRIES: i32 = 3;

/// Backoff base in seconds; retry `n` waits `base * 2^n`.
pub const BACKOFF_BASE_SECS: i64 = 60;

/// Upper bound for a single backoff delay.
pub const MAX_BACKOFF_SECS: i64 = 3600;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// How a delivery attempt failed, from the queue's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeout, 5xx, throttling: worth retrying.
    Transient,
    /// Invalid recipient, expired subscription: never retried.
    Permanent,
}

/// What to do with an entry after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Put the entry back to `pending` with the new count and schedule.
    Retry {
        retry_count: i32,
        scheduled_at: Timestamp,
    },
    /// Mark the entry `failed`; `retry_count` is left at this value.
    GiveUp { retry_count: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: i32,
    pub base_delay_secs: i64,
    pub max_delay_secs: i64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay_secs: BACKOFF_BASE_SECS,
            max_delay_secs: MAX_BACKOFF_SECS,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry_count` (1-based), capped.
    pub fn delay_secs(&self, retry_count: i32) -> i64 {
        let factor = 2i64.saturating_pow(retry_count.max(0) as u32);
        self.base_delay_secs
            .saturating_mul(factor)
            .min(self.max_delay_secs)
    }

    /// Decide the next state after a failed attempt at `now`.
    pub fn after_failure(
        &self,
        current_retry_count: i32,
        kind: FailureKind,
        now: Timestamp,
    ) -> RetryDecision {
        let current = current_retry_count.clamp(0, self.max_retries);
        if kind == FailureKind::Permanent || current >= self.max_retries {
            return RetryDecision::GiveUp {
                retry_count: current,
            };
        }

        let retry_count = current + 1;
        RetryDecision::Retry {
            retry_count,
            scheduled_at: now + Duration::seconds(self.delay_secs(retry_count)),
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Queue status IDs matching `queue_statuses` seed data (1-based SMALLSERIAL).
///
/// Duplicated from the `db` crate's `QueueStatus` enum because `core` must
/// have zero internal deps. Automatic transitions (pending -> sending ->
/// sent / failed / pending) are enforced by the conditional updates in the
/// queue repositories; terminal states are only reopened by an operator.
pub mod state_machine {
    use super::StatusId;

    /// Whether an operator may push an entry in `status` back to pending.
    ///
    /// Only `failed` (4) and `cancelled` (5) qualify.
    pub fn can_manually_retry(status: StatusId) -> bool {
        matches!(status, 4 | 5)
    }

    /// Human-readable name for a status ID (for error messages).
    pub fn status_name(id: StatusId) -> &'static str {
        match id {
            1 => "pending",
            2 => "sending",
            3 => "sent",
            4 => "failed",
            5 => "cancelled",
            _ => "unknown",
        }
    }
}
