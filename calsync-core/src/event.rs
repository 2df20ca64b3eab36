//! The local event representation.
//!
//! Events are created on pull (origin `External`) or by the local editing
//! path (origin `Local`, outside this crate). `external_id` is the join key
//! to the provider and the sole deduplication key. No reconciliation by
//! title or time is ever performed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A locally stored calendar event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEvent {
    pub local_id: String,
    /// Provider-side id; assigned on first successful push or discovered
    /// on first pull-match.
    pub external_id: Option<String>,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub origin: EventOrigin,
    pub sync_status: SyncStatus,
}

/// Which side last authored the event's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    Local,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Error,
}
