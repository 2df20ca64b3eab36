//! Watch-channel lifecycle: create, stop, renew.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use calsync_core::channel::WatchChannel;
use calsync_core::error::{SyncError, SyncResult};
use calsync_core::locks::KeyedLocks;
use calsync_core::provider::{CalendarProvider, ProviderError};
use calsync_core::store::Store;

use crate::credentials::CredentialManager;

pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Bounded channel lifetime requested from the provider.
const CHANNEL_LIFETIME_DAYS: i64 = 7;

pub struct WatchChannelManager {
    store: Arc<dyn Store>,
    provider: Arc<dyn CalendarProvider>,
    credentials: Arc<CredentialManager>,
    /// Public callback address registered on every channel.
    callback_url: String,
    /// Serializes stop/create pairs per (user, calendar).
    locks: KeyedLocks<(String, String)>,
}

/// Outcome of one renewal sweep.
#[derive(Debug, Default)]
pub struct RenewalSweep {
    pub renewed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl WatchChannelManager {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn CalendarProvider>,
        credentials: Arc<CredentialManager>,
        callback_url: String,
    ) -> Self {
        WatchChannelManager {
            store,
            provider,
            credentials,
            callback_url,
            locks: KeyedLocks::new(),
        }
    }

    /// Register a push subscription for the user's calendar and persist it.
    /// Stops a pre-existing channel for the same calendar first, so at most
    /// one channel per (user, calendar) is ever active.
    pub async fn create_channel(&self, user_id: &str, calendar_id: &str) -> SyncResult<String> {
        let _guard = self
            .locks
            .exclusive(&(user_id.to_string(), calendar_id.to_string()))
            .await;
        self.create_locked(user_id, calendar_id).await
    }

    async fn create_locked(&self, user_id: &str, calendar_id: &str) -> SyncResult<String> {
        if let Some(existing) = self.store.channel_for_calendar(user_id, calendar_id).await? {
            self.stop_locked(&existing).await?;
        }

        let credential = self.credentials.get_valid(user_id).await?;
        let channel_id = Uuid::new_v4().to_string();
        let expiration = Utc::now() + Duration::days(CHANNEL_LIFETIME_DAYS);

        let handle = self
            .provider
            .create_watch(
                &credential.access_token,
                calendar_id,
                &channel_id,
                &self.callback_url,
                expiration,
            )
            .await
            .map_err(|err| SyncError::ChannelCreateFailed(err.to_string()))?;

        self.store
            .insert_channel(&WatchChannel {
                channel_id: channel_id.clone(),
                user_id: user_id.to_string(),
                calendar_id: calendar_id.to_string(),
                resource_id: handle.resource_id,
                expiration: handle.expiration,
            })
            .await?;

        info!(user_id, calendar_id, channel_id = %channel_id, "created watch channel");
        Ok(channel_id)
    }

    /// Cancel a channel on the provider and remove the local row. The row
    /// is only removed once cancellation succeeded or the provider no
    /// longer knows the channel.
    pub async fn stop_channel(&self, user_id: &str, channel_id: &str) -> SyncResult<()> {
        let channel = self
            .store
            .channel_by_id(channel_id)
            .await?
            .filter(|c| c.user_id == user_id)
            .ok_or_else(|| SyncError::NotFound(format!("channel '{}'", channel_id)))?;

        let _guard = self
            .locks
            .exclusive(&(channel.user_id.clone(), channel.calendar_id.clone()))
            .await;
        self.stop_locked(&channel).await
    }

    async fn stop_locked(&self, channel: &WatchChannel) -> SyncResult<()> {
        let credential = self.credentials.get_valid(&channel.user_id).await?;

        match self
            .provider
            .stop_watch(
                &credential.access_token,
                &channel.channel_id,
                &channel.resource_id,
            )
            .await
        {
            Ok(()) => {}
            // Already unknown to the provider counts as stopped.
            Err(ProviderError::NotFound) => {
                debug!(channel_id = %channel.channel_id, "channel already gone on the provider")
            }
            Err(err) => {
                return Err(SyncError::ChannelStopFailed {
                    channel_id: channel.channel_id.clone(),
                    reason: err.to_string(),
                })
            }
        }

        self.store.delete_channel(&channel.channel_id).await?;
        info!(channel_id = %channel.channel_id, "stopped watch channel");
        Ok(())
    }

    /// Stop-then-create every channel expiring within `threshold`.
    ///
    /// Renewal is not atomic: when create fails after a successful stop the
    /// user is left without a channel until the next pass or the nightly
    /// full resync. That gap is surfaced as `ChannelRenewalGap` so it shows
    /// up distinctly in the sweep's errors.
    pub async fn renew_expiring(&self, threshold: Duration) -> SyncResult<RenewalSweep> {
        let cutoff = Utc::now() + threshold;
        let expiring = self.store.channels_expiring_before(cutoff).await?;

        let mut sweep = RenewalSweep::default();
        for channel in expiring {
            match self.renew_one(&channel).await {
                Ok(()) => sweep.renewed += 1,
                Err(err) => {
                    warn!(
                        user_id = %channel.user_id,
                        channel_id = %channel.channel_id,
                        error = %err,
                        "channel renewal failed"
                    );
                    sweep.failed += 1;
                    sweep.errors.push(err.to_string());
                }
            }
        }

        Ok(sweep)
    }

    async fn renew_one(&self, channel: &WatchChannel) -> SyncResult<()> {
        let _guard = self
            .locks
            .exclusive(&(channel.user_id.clone(), channel.calendar_id.clone()))
            .await;

        if channel.expiration <= Utc::now() {
            // Already lapsed: the provider side is gone, drop the row
            // without a stop call.
            self.store.delete_channel(&channel.channel_id).await?;
        } else {
            self.stop_locked(channel).await?;
        }

        self.create_locked(&channel.user_id, &channel.calendar_id)
            .await
            .map(|_| ())
            .map_err(|err| SyncError::ChannelRenewalGap {
                user_id: channel.user_id.clone(),
                calendar_id: channel.calendar_id.clone(),
                reason: err.to_string(),
            })
    }
}
