//! In-memory store.
//!
//! Backs the engine's tests and the default server wiring. Enforces the
//! same uniqueness rules a relational store would: one credential per user,
//! events unique on external id, channels unique on channel id.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::channel::WatchChannel;
use crate::credential::UserCredential;
use crate::event::LocalEvent;
use crate::sync_log::{SyncDirection, SyncLogEntry};

use super::{Store, StoreError, StoreResult};

#[derive(Default)]
struct Collections {
    credentials: HashMap<String, UserCredential>,
    /// Keyed by local id.
    events: HashMap<String, LocalEvent>,
    /// Keyed by channel id.
    channels: HashMap<String, WatchChannel>,
    sync_log: Vec<SyncLogEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_credential(&self, user_id: &str) -> StoreResult<Option<UserCredential>> {
        Ok(self.inner.read().await.credentials.get(user_id).cloned())
    }

    async fn save_credential(&self, credential: &UserCredential) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .credentials
            .insert(credential.user_id.clone(), credential.clone());
        Ok(())
    }

    async fn set_connected(&self, user_id: &str, connected: bool) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let credential = inner
            .credentials
            .get_mut(user_id)
            .ok_or_else(|| StoreError(format!("no credential for user '{}'", user_id)))?;
        credential.connected = connected;
        Ok(())
    }

    async fn connected_users(&self) -> StoreResult<Vec<String>> {
        let inner = self.inner.read().await;
        let mut users: Vec<String> = inner
            .credentials
            .values()
            .filter(|c| c.connected)
            .map(|c| c.user_id.clone())
            .collect();
        users.sort();
        Ok(users)
    }

    async fn event_by_local_id(&self, local_id: &str) -> StoreResult<Option<LocalEvent>> {
        Ok(self.inner.read().await.events.get(local_id).cloned())
    }

    async fn event_by_external_id(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> StoreResult<Option<LocalEvent>> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .values()
            .find(|e| e.user_id == user_id && e.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert_event(&self, event: &LocalEvent) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.events.contains_key(&event.local_id) {
            return Err(StoreError(format!(
                "event '{}' already exists",
                event.local_id
            )));
        }
        if let Some(external_id) = event.external_id.as_deref() {
            let duplicate = inner
                .events
                .values()
                .any(|e| e.user_id == event.user_id && e.external_id.as_deref() == Some(external_id));
            if duplicate {
                return Err(StoreError(format!(
                    "external id '{}' already exists for user '{}'",
                    external_id, event.user_id
                )));
            }
        }
        inner.events.insert(event.local_id.clone(), event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &LocalEvent) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .events
            .get_mut(&event.local_id)
            .ok_or_else(|| StoreError(format!("event '{}' does not exist", event.local_id)))?;
        *slot = event.clone();
        Ok(())
    }

    async fn insert_channel(&self, channel: &WatchChannel) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.channels.contains_key(&channel.channel_id) {
            return Err(StoreError(format!(
                "channel '{}' already exists",
                channel.channel_id
            )));
        }
        inner
            .channels
            .insert(channel.channel_id.clone(), channel.clone());
        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> StoreResult<()> {
        self.inner.write().await.channels.remove(channel_id);
        Ok(())
    }

    async fn channel_by_id(&self, channel_id: &str) -> StoreResult<Option<WatchChannel>> {
        Ok(self.inner.read().await.channels.get(channel_id).cloned())
    }

    async fn channel_for_calendar(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> StoreResult<Option<WatchChannel>> {
        let inner = self.inner.read().await;
        Ok(inner
            .channels
            .values()
            .find(|c| c.user_id == user_id && c.calendar_id == calendar_id)
            .cloned())
    }

    async fn channels_expiring_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<WatchChannel>> {
        let inner = self.inner.read().await;
        let mut expiring: Vec<WatchChannel> = inner
            .channels
            .values()
            .filter(|c| c.expiration < cutoff)
            .cloned()
            .collect();
        expiring.sort_by(|a, b| a.expiration.cmp(&b.expiration));
        Ok(expiring)
    }

    async fn append_sync_log(&self, entry: &SyncLogEntry) -> StoreResult<()> {
        self.inner.write().await.sync_log.push(entry.clone());
        Ok(())
    }

    async fn last_pull_entry(&self, user_id: &str) -> StoreResult<Option<SyncLogEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sync_log
            .iter()
            .rev()
            .find(|e| e.user_id == user_id && e.direction == SyncDirection::Pull)
            .cloned())
    }

    async fn recent_sync_entries(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<SyncLogEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sync_log
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
