//! Webhook dispatch: resolving a push notification to a user and pulling.

use std::sync::Arc;

use tracing::{info, warn};

use calsync_core::error::SyncError;
use calsync_core::store::Store;

use crate::sync::SyncEngine;

pub struct WebhookDispatcher {
    store: Arc<dyn Store>,
    engine: Arc<SyncEngine>,
}

impl WebhookDispatcher {
    pub fn new(store: Arc<dyn Store>, engine: Arc<SyncEngine>) -> Self {
        WebhookDispatcher { store, engine }
    }

    /// Handle one provider notification. Returns whether a pull ran and
    /// succeeded.
    ///
    /// Unknown channel ids fail silently: a channel can be stale after a
    /// missed stop, and the provider keeps notifying it for a while. The
    /// resumption token comes from the most recent pull log entry; when the
    /// provider reports it expired, we retry once with a full listing.
    pub async fn on_notification(&self, channel_id: &str, resource_id: &str) -> bool {
        let channel = match self.store.channel_by_id(channel_id).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                warn!(channel_id, "notification for unknown channel, ignoring");
                return false;
            }
            Err(err) => {
                warn!(channel_id, error = %err, "channel lookup failed");
                return false;
            }
        };

        if channel.resource_id != resource_id {
            warn!(
                channel_id,
                resource_id, "notification resource id does not match the channel, ignoring"
            );
            return false;
        }

        let user_id = channel.user_id;
        let sync_token = match self.store.last_pull_entry(&user_id).await {
            Ok(entry) => entry.and_then(|e| e.sync_token),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "sync log lookup failed, doing a full pull");
                None
            }
        };

        match self.engine.pull(&user_id, sync_token.as_deref()).await {
            Ok(report) => {
                info!(
                    user_id = %user_id,
                    events = report.events_processed,
                    errors = report.errors_count,
                    "webhook pull complete"
                );
                true
            }
            Err(SyncError::SyncTokenExpired) => {
                info!(user_id = %user_id, "sync token expired, falling back to a full pull");
                self.engine.pull(&user_id, None).await.is_ok()
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "webhook pull failed");
                false
            }
        }
    }
}
