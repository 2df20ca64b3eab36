//! Sync attempt records.
//!
//! The log is append-only. The most recent pull entry's `sync_token` is the
//! resumption point for the next incremental pull.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Pull,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Success,
    Partial,
    Error,
}

/// One row in the sync log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub user_id: String,
    pub direction: SyncDirection,
    pub outcome: SyncOutcome,
    pub events_processed: u32,
    pub errors_count: u32,
    pub error_details: Vec<String>,
    pub sync_token: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Result of a completed sync operation.
///
/// A completed pull may still carry per-event errors; reconciliation is
/// partial-failure tolerant. Operations that abort before the batch runs
/// (credential or listing failures) surface as `SyncError` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub events_processed: u32,
    pub errors_count: u32,
    pub error_details: Vec<String>,
    /// Cursor for the next incremental pull, when the provider returned one.
    pub sync_token: Option<String>,
}

impl SyncReport {
    pub fn outcome(&self) -> SyncOutcome {
        if self.errors_count == 0 {
            SyncOutcome::Success
        } else {
            SyncOutcome::Partial
        }
    }
}
