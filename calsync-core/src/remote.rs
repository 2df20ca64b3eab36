//! Provider-neutral external event types.
//!
//! Providers convert their API responses into these types, and the engine
//! works exclusively with them for reconciliation. The types are
//! deliberately lenient: missing fields are surfaced by the mapper as
//! per-event errors instead of being rejected at the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event as the external service represents it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteEvent {
    /// Provider-assigned id. Empty for an event that has not been pushed yet.
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start: Option<RemoteTime>,
    pub end: Option<RemoteTime>,
    /// Provider-side modification timestamp. Absent on malformed records;
    /// the mapper treats that as an error rather than defaulting it.
    pub updated: Option<DateTime<Utc>>,
}

/// A point in time as the provider expresses it: a timestamp, an all-day
/// date, or a timestamp carrying an explicit timezone label (used on push).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Zoned { datetime: DateTime<Utc>, tzid: String },
}

impl RemoteTime {
    /// Resolve to an instant. All-day dates normalize to midnight UTC.
    pub fn to_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            RemoteTime::DateTime(dt) => Some(*dt),
            RemoteTime::Date(d) => Some(d.and_hms_opt(0, 0, 0)?.and_utc()),
            RemoteTime::Zoned { datetime, .. } => Some(*datetime),
        }
    }
}
