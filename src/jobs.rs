//! Periodic jobs: watch-channel renewal and the nightly full resync.
//!
//! Runs outside of any request path on tokio timers. Shutdown is
//! cooperative: the resync sweep checks for it between users, so a stopped
//! sweep leaves every already-processed user in a consistent, logged state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use calsync_core::store::Store;

use crate::channels::WatchChannelManager;
use crate::sync::SyncEngine;

pub struct Scheduler {
    engine: Arc<SyncEngine>,
    channels: Arc<WatchChannelManager>,
    store: Arc<dyn Store>,
    renew_interval: Duration,
    resync_interval: Duration,
    renew_threshold: chrono::Duration,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        channels: Arc<WatchChannelManager>,
        store: Arc<dyn Store>,
        renew_interval: Duration,
        resync_interval: Duration,
        renew_threshold: chrono::Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Scheduler {
            engine,
            channels,
            store,
            renew_interval,
            resync_interval,
            renew_threshold,
            shutdown,
        }
    }

    pub async fn run(self) {
        let mut shutdown = self.shutdown.clone();

        let start = time::Instant::now();
        let mut renew = time::interval_at(start + self.renew_interval, self.renew_interval);
        let mut resync = time::interval_at(start + self.resync_interval, self.resync_interval);
        renew.set_missed_tick_behavior(MissedTickBehavior::Delay);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            renew_interval_secs = self.renew_interval.as_secs(),
            resync_interval_secs = self.resync_interval.as_secs(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("scheduler stopping");
                    return;
                }
                _ = renew.tick() => self.renew_channels_job().await,
                _ = resync.tick() => self.full_resync_job().await,
            }
        }
    }

    /// Drive the renewal sweep over channels nearing expiration.
    pub async fn renew_channels_job(&self) {
        match self.channels.renew_expiring(self.renew_threshold).await {
            Ok(sweep) => info!(
                renewed = sweep.renewed,
                failed = sweep.failed,
                "channel renewal sweep complete"
            ),
            Err(err) => warn!(error = %err, "channel renewal sweep failed"),
        }
    }

    /// Full pull for every connected user. Per-user failures are logged and
    /// never stop the sweep over the remaining users.
    pub async fn full_resync_job(&self) {
        let users = match self.store.connected_users().await {
            Ok(users) => users,
            Err(err) => {
                warn!(error = %err, "could not list connected users for resync");
                return;
            }
        };

        info!(users = users.len(), "full resync starting");
        for user_id in users {
            if *self.shutdown.borrow() {
                info!("full resync interrupted by shutdown");
                return;
            }

            match self.engine.pull(&user_id, None).await {
                Ok(report) => info!(
                    user_id = %user_id,
                    events = report.events_processed,
                    errors = report.errors_count,
                    "resynced user"
                ),
                Err(err) => warn!(user_id = %user_id, error = %err, "resync failed for user"),
            }
        }
        info!("full resync complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialManager;
    use crate::testing::{connected_credential, ScriptedProvider};
    use calsync_core::provider::ProviderError;
    use calsync_core::store::MemoryStore;
    use calsync_core::sync_log::SyncOutcome;
    use chrono::Utc;

    fn scheduler(
        store: Arc<MemoryStore>,
        provider: Arc<ScriptedProvider>,
    ) -> (watch::Sender<bool>, Scheduler) {
        let credentials = Arc::new(CredentialManager::new(store.clone(), provider.clone()));
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            provider.clone(),
            credentials.clone(),
            "primary".to_string(),
            chrono_tz::Europe::Rome,
        ));
        let channels = Arc::new(WatchChannelManager::new(
            store.clone(),
            provider,
            credentials,
            "https://sync.example.com/webhook/google".to_string(),
        ));
        let (tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(
            engine,
            channels,
            store,
            Duration::from_secs(3600),
            Duration::from_secs(86400),
            chrono::Duration::hours(24),
            rx,
        );
        (tx, scheduler)
    }

    #[tokio::test]
    async fn resync_covers_every_connected_user_despite_failures() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        for user in ["u1", "u2", "u3"] {
            store
                .save_credential(&connected_credential(
                    user,
                    Utc::now() + chrono::Duration::hours(1),
                ))
                .await
                .unwrap();
        }
        // u2's listing fails; the sweep must still reach u3.
        provider.queue_list(Ok(Default::default()));
        provider.queue_list(Err(ProviderError::Api {
            status: 500,
            message: "backend error".to_string(),
        }));
        provider.queue_list(Ok(Default::default()));

        let (_tx, scheduler) = scheduler(store.clone(), provider.clone());
        scheduler.full_resync_job().await;

        assert_eq!(provider.list_requests.lock().unwrap().len(), 3);
        let failed = store.last_pull_entry("u2").await.unwrap().unwrap();
        assert_eq!(failed.outcome, SyncOutcome::Error);
        let ok = store.last_pull_entry("u3").await.unwrap().unwrap();
        assert_eq!(ok.outcome, SyncOutcome::Success);
    }

    #[tokio::test]
    async fn resync_skips_disconnected_users() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        let mut credential =
            connected_credential("u1", Utc::now() + chrono::Duration::hours(1));
        credential.connected = false;
        store.save_credential(&credential).await.unwrap();

        let (_tx, scheduler) = scheduler(store, provider.clone());
        scheduler.full_resync_job().await;

        assert!(provider.list_requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_is_honored_between_users() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::default());
        store
            .save_credential(&connected_credential(
                "u1",
                Utc::now() + chrono::Duration::hours(1),
            ))
            .await
            .unwrap();

        let (tx, scheduler) = scheduler(store, provider.clone());
        tx.send(true).unwrap();
        scheduler.full_resync_job().await;

        assert!(provider.list_requests.lock().unwrap().is_empty());
    }
}
