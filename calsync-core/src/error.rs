//! Error types for the calsync ecosystem.

use thiserror::Error;

use crate::provider::ProviderError;
use crate::store::StoreError;

/// Errors that can occur in calsync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The user has no stored credential (or no refresh token), so no
    /// provider call can be made until they authorize.
    #[error("no calendar connection for user '{0}'")]
    NotConnected(String),

    /// The provider rejected the refresh grant. Terminal until the user
    /// re-authenticates; the connection flag is cleared as a side effect.
    #[error("credentials rejected for user '{user_id}': {reason}")]
    CredentialsInvalid { user_id: String, reason: String },

    #[error("failed to create watch channel: {0}")]
    ChannelCreateFailed(String),

    #[error("failed to stop watch channel '{channel_id}': {reason}")]
    ChannelStopFailed { channel_id: String, reason: String },

    /// The incremental sync token was invalidated by the provider. Callers
    /// retry with no token (full listing).
    #[error("sync token is no longer valid")]
    SyncTokenExpired,

    /// A malformed external event record. Skipped and counted during a
    /// pull, never aborts the batch.
    #[error("malformed external event: {0}")]
    EventMapping(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Renewal stopped the old channel but could not create its
    /// replacement. The user has no active channel until the next renewal
    /// pass or full resync.
    #[error("channel renewal for user '{user_id}' calendar '{calendar_id}' left no active channel: {reason}")]
    ChannelRenewalGap {
        user_id: String,
        calendar_id: String,
        reason: String,
    },

    /// The OAuth state value did not round-trip a user id.
    #[error("invalid oauth state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for calsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
