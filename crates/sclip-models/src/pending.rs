//! Pending OAuth authorizations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A linking flow that has started but whose callback has not arrived yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub state_token: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl PendingAuthorization {
    pub fn new(state_token: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            state_token: state_token.into(),
            owner_id: owner_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether the pairing is older than `ttl` at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}
