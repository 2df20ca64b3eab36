//! The persistent store contract.
//!
//! Four logical collections: `users` (credential + connection flag),
//! `events` (unique on external id when present), `watch_channels` (unique
//! on channel id), and `sync_log` (append-only). Schema enforcement belongs
//! to the backing store; the engine only relies on the operations below.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryStore;

use crate::channel::WatchChannel;
use crate::credential::UserCredential;
use crate::event::LocalEvent;
use crate::sync_log::SyncLogEntry;

#[derive(Error, Debug, Clone)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // Credentials
    async fn load_credential(&self, user_id: &str) -> StoreResult<Option<UserCredential>>;
    async fn save_credential(&self, credential: &UserCredential) -> StoreResult<()>;
    async fn set_connected(&self, user_id: &str, connected: bool) -> StoreResult<()>;
    async fn connected_users(&self) -> StoreResult<Vec<String>>;

    // Events
    async fn event_by_local_id(&self, local_id: &str) -> StoreResult<Option<LocalEvent>>;
    async fn event_by_external_id(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> StoreResult<Option<LocalEvent>>;
    async fn insert_event(&self, event: &LocalEvent) -> StoreResult<()>;
    async fn update_event(&self, event: &LocalEvent) -> StoreResult<()>;

    // Watch channels
    async fn insert_channel(&self, channel: &WatchChannel) -> StoreResult<()>;
    async fn delete_channel(&self, channel_id: &str) -> StoreResult<()>;
    async fn channel_by_id(&self, channel_id: &str) -> StoreResult<Option<WatchChannel>>;
    async fn channel_for_calendar(
        &self,
        user_id: &str,
        calendar_id: &str,
    ) -> StoreResult<Option<WatchChannel>>;
    async fn channels_expiring_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<WatchChannel>>;

    // Sync log
    async fn append_sync_log(&self, entry: &SyncLogEntry) -> StoreResult<()>;
    async fn last_pull_entry(&self, user_id: &str) -> StoreResult<Option<SyncLogEntry>>;
    async fn recent_sync_entries(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<SyncLogEntry>>;
}
