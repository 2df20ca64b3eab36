//! Stored per-user provider credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair for a connected user.
///
/// The refresh token is immutable once set: a refresh only replaces the
/// access token and expiry, unless the provider rotates the refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredential {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
    pub connected: bool,
}

impl UserCredential {
    /// Whether the access token is usable at `now`, with a safety margin so
    /// a token about to lapse mid-request counts as expired.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        now + margin < self.expiry
    }
}
