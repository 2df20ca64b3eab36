//! Core types for the calsync ecosystem.
//!
//! This crate provides the shared pieces used by the sync service and by
//! provider implementations:
//! - `event` / `remote` for the local and external event representations
//! - `mapper` for translating between the two
//! - `provider` and `store` for the contracts the engine is built against
//! - `error` for the sync error taxonomy

pub mod channel;
pub mod credential;
pub mod error;
pub mod event;
pub mod locks;
pub mod mapper;
pub mod oauth;
pub mod provider;
pub mod remote;
pub mod store;
pub mod sync_log;

pub use channel::WatchChannel;
pub use credential::UserCredential;
pub use error::{SyncError, SyncResult};
pub use event::{EventOrigin, LocalEvent, SyncStatus};
pub use remote::{RemoteEvent, RemoteTime};
pub use sync_log::{SyncDirection, SyncLogEntry, SyncOutcome, SyncReport};
