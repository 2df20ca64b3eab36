//! Credential lifecycle: obtaining valid, non-expired tokens for a user.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use calsync_core::credential::UserCredential;
use calsync_core::error::{SyncError, SyncResult};
use calsync_core::provider::CalendarProvider;
use calsync_core::store::Store;

/// Treat tokens expiring within this margin as already expired, so a token
/// can't lapse between our check and the provider call.
const REFRESH_MARGIN_SECS: i64 = 60;

pub struct CredentialManager {
    store: Arc<dyn Store>,
    provider: Arc<dyn CalendarProvider>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn CalendarProvider>) -> Self {
        CredentialManager { store, provider }
    }

    /// Return usable credentials for the user, refreshing and persisting
    /// when the cached access token has expired. No network call is made
    /// while the cached token is still valid.
    pub async fn get_valid(&self, user_id: &str) -> SyncResult<UserCredential> {
        let Some(mut credential) = self.store.load_credential(user_id).await? else {
            return Err(SyncError::NotConnected(user_id.to_string()));
        };

        if !credential.connected || credential.refresh_token.is_empty() {
            return Err(SyncError::NotConnected(user_id.to_string()));
        }

        if credential.is_fresh(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Ok(credential);
        }

        match self
            .provider
            .refresh_credentials(&credential.refresh_token)
            .await
        {
            Ok(refreshed) => {
                credential.access_token = refreshed.access_token;
                credential.expiry = refreshed.expires_at;
                // Providers rarely rotate the refresh token; keep ours
                // unless a new one was issued.
                if let Some(rotated) = refreshed.refresh_token {
                    credential.refresh_token = rotated;
                }
                self.store.save_credential(&credential).await?;
                info!(user_id, "refreshed access token");
                Ok(credential)
            }
            Err(err) if err.is_retryable() => Err(err.into()),
            Err(err) => {
                // The grant was rejected (revoked or invalid). Flip the
                // connection flag so scheduled jobs stop retrying the user
                // until they re-authorize.
                warn!(user_id, error = %err, "refresh grant rejected, disconnecting user");
                self.store.set_connected(user_id, false).await?;
                Err(SyncError::CredentialsInvalid {
                    user_id: user_id.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Exchange an authorization code and persist the resulting credential
    /// with the connection flag set.
    pub async fn connect(&self, user_id: &str, code: &str) -> SyncResult<UserCredential> {
        let grant = self.provider.exchange_code(code).await?;

        let credential = UserCredential {
            user_id: user_id.to_string(),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expiry: grant.expires_at,
            connected: true,
        };
        self.store.save_credential(&credential).await?;
        info!(user_id, "calendar account connected");

        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{connected_credential, ScriptedProvider};
    use calsync_core::provider::ProviderError;
    use calsync_core::store::MemoryStore;
    use std::sync::atomic::Ordering;

    fn manager(store: Arc<MemoryStore>, provider: Arc<ScriptedProvider>) -> CredentialManager {
        CredentialManager::new(store, provider)
    }

    #[tokio::test]
    async fn missing_credential_is_not_connected() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        let err = manager(store, provider).get_valid("u1").await.unwrap_err();
        assert!(matches!(err, SyncError::NotConnected(_)));
    }

    #[tokio::test]
    async fn fresh_token_makes_no_provider_call() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        store
            .save_credential(&connected_credential("u1", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        let credential = manager(store, provider.clone())
            .get_valid("u1")
            .await
            .unwrap();
        assert_eq!(credential.access_token, "access-0");
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_token_refreshes_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        store
            .save_credential(&connected_credential("u1", Utc::now() - Duration::hours(1)))
            .await
            .unwrap();

        let manager = manager(store.clone(), provider.clone());

        let credential = manager.get_valid("u1").await.unwrap();
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(credential.access_token, "refreshed-access");
        // Refresh token survives a refresh that did not rotate it.
        assert_eq!(credential.refresh_token, "refresh-0");

        // The refreshed expiry was persisted, so a second call stays local.
        let again = manager.get_valid("u1").await.unwrap();
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.access_token, "refreshed-access");
    }

    #[tokio::test]
    async fn rejected_refresh_disconnects_the_user() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        provider.fail_refresh_with(ProviderError::Unauthorized);
        store
            .save_credential(&connected_credential("u1", Utc::now() - Duration::hours(1)))
            .await
            .unwrap();

        let err = manager(store.clone(), provider)
            .get_valid("u1")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::CredentialsInvalid { .. }));

        let stored = store.load_credential("u1").await.unwrap().unwrap();
        assert!(!stored.connected);
    }

    #[tokio::test]
    async fn transient_refresh_failure_keeps_the_user_connected() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        provider.fail_refresh_with(ProviderError::Transport("timed out".to_string()));
        store
            .save_credential(&connected_credential("u1", Utc::now() - Duration::hours(1)))
            .await
            .unwrap();

        let err = manager(store.clone(), provider)
            .get_valid("u1")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Provider(_)));

        let stored = store.load_credential("u1").await.unwrap().unwrap();
        assert!(stored.connected);
    }

    #[tokio::test]
    async fn failed_exchange_persists_nothing() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        provider.fail_exchange_with(ProviderError::Api {
            status: 400,
            message: "invalid_grant".to_string(),
        });

        let err = manager(store.clone(), provider)
            .connect("u1", "bad-code")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Provider(_)));
        assert!(store.load_credential("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn connect_persists_the_grant() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());

        let credential = manager(store.clone(), provider)
            .connect("u1", "auth-code")
            .await
            .unwrap();
        assert!(credential.connected);

        let stored = store.load_credential("u1").await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, "granted-refresh");
    }
}
