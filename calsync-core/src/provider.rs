//! The calendar provider contract.
//!
//! The external service is consumed through this trait so the engine can be
//! exercised against scripted doubles in tests. `calsync-provider-google`
//! implements it over the Calendar REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::remote::RemoteEvent;

/// Errors from provider calls.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// The access token was rejected (expired, revoked, or insufficient).
    #[error("provider rejected the access token")]
    Unauthorized,

    /// The incremental sync token is no longer valid; a full listing is
    /// required.
    #[error("sync token expired or invalidated by the provider")]
    TokenExpired,

    #[error("resource not found on the provider")]
    NotFound,

    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network-level failure, including bounded timeouts.
    #[error("provider transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Classify an HTTP status from the provider.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Unauthorized,
            404 => ProviderError::NotFound,
            410 => ProviderError::TokenExpired,
            429 => ProviderError::RateLimited,
            _ => ProviderError::Api { status, message },
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited | ProviderError::Transport(_) => true,
            ProviderError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Tokens returned by the authorization-code grant.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Tokens returned by the refresh grant. Providers typically do not rotate
/// the refresh token, so it is optional here.
#[derive(Debug, Clone)]
pub struct TokenRefresh {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// One listing result: all items plus the cursor for the next incremental
/// call.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<RemoteEvent>,
    pub next_sync_token: Option<String>,
}

/// Provider-side identity of a created watch channel.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    pub resource_id: String,
    pub expiration: DateTime<Utc>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Build the user-facing consent URL carrying an opaque state value.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError>;

    /// Run the refresh grant for a stored refresh token.
    async fn refresh_credentials(&self, refresh_token: &str)
        -> Result<TokenRefresh, ProviderError>;

    /// List events, incrementally when `sync_token` is given, else a full
    /// listing. Signals `TokenExpired` when the cursor is no longer valid.
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        sync_token: Option<&str>,
    ) -> Result<EventPage, ProviderError>;

    /// Create an event, returning the provider's representation (with its
    /// assigned id).
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &RemoteEvent,
    ) -> Result<RemoteEvent, ProviderError>;

    /// Update an existing event by provider id.
    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &RemoteEvent,
    ) -> Result<RemoteEvent, ProviderError>;

    /// Register a push-notification channel for a calendar.
    async fn create_watch(
        &self,
        access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        callback_url: &str,
        expiration: DateTime<Utc>,
    ) -> Result<WatchHandle, ProviderError>;

    /// Cancel a push-notification channel. Signals `NotFound` when the
    /// provider no longer knows the channel.
    async fn stop_watch(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            ProviderError::from_status(401, String::new()),
            ProviderError::Unauthorized
        ));
        assert!(matches!(
            ProviderError::from_status(410, String::new()),
            ProviderError::TokenExpired
        ));
        assert!(matches!(
            ProviderError::from_status(404, String::new()),
            ProviderError::NotFound
        ));
        assert!(matches!(
            ProviderError::from_status(429, String::new()),
            ProviderError::RateLimited
        ));
        assert!(matches!(
            ProviderError::from_status(500, String::new()),
            ProviderError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn retryability() {
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(ProviderError::Transport("timed out".into()).is_retryable());
        assert!(ProviderError::Api {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::Unauthorized.is_retryable());
        assert!(!ProviderError::TokenExpired.is_retryable());
        assert!(!ProviderError::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
    }
}
