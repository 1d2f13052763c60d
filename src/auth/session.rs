//! Session expiry countdown.
//!
//! A session is `Active` until the warning window opens, `Warning` while the
//! client should prompt for a refresh, and `Expired` once the token's `exp`
//! has passed. Refreshing is the identity provider's job.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Active,
    Warning,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionStatus {
    pub state: SessionState,
    pub expires_at: DateTime<Utc>,
    pub remaining_secs: i64,
    pub warning_threshold_secs: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionTimer {
    expires_at: DateTime<Utc>,
    warning_window: Duration,
}

impl SessionTimer {
    pub fn new(expires_at: DateTime<Utc>, warning_window: Duration) -> Self {
        let warning_window = if warning_window < Duration::zero() {
            Duration::zero()
        } else {
            warning_window
        };
        Self {
            expires_at,
            warning_window,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn warning_starts_at(&self) -> DateTime<Utc> {
        self.expires_at - self.warning_window
    }

    /// Time left, never negative
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let left = self.expires_at - now;
        if left < Duration::zero() {
            Duration::zero()
        } else {
            left
        }
    }

    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if now >= self.expires_at {
            SessionState::Expired
        } else if now >= self.warning_starts_at() {
            SessionState::Warning
        } else {
            SessionState::Active
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> SessionStatus {
        SessionStatus {
            state: self.state(now),
            expires_at: self.expires_at,
            remaining_secs: self.remaining(now).num_seconds(),
            warning_threshold_secs: self.warning_window.num_seconds(),
        }
    }
}
