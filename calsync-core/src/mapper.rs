//! Bidirectional translation between the external and local event shapes.

use chrono::Utc;
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::event::{EventOrigin, LocalEvent, SyncStatus};
use crate::remote::{RemoteEvent, RemoteTime};

/// Map an external event to a fresh local event.
///
/// Start/end resolve from either a timestamp or an all-day date (normalized
/// to midnight UTC). A missing `updated` timestamp is a malformed record,
/// not a defaultable field, since defaulting it would silently mis-order
/// reconciliation.
pub fn from_external(user_id: &str, raw: &RemoteEvent) -> SyncResult<LocalEvent> {
    if raw.id.is_empty() {
        return Err(SyncError::EventMapping("event has no id".to_string()));
    }

    let start = resolve_instant(raw.start.as_ref())
        .ok_or_else(|| SyncError::EventMapping(format!("event '{}' has no start time", raw.id)))?;
    let end = resolve_instant(raw.end.as_ref())
        .ok_or_else(|| SyncError::EventMapping(format!("event '{}' has no end time", raw.id)))?;
    let updated = raw.updated.ok_or_else(|| {
        SyncError::EventMapping(format!("event '{}' has no updated timestamp", raw.id))
    })?;

    Ok(LocalEvent {
        local_id: Uuid::new_v4().to_string(),
        external_id: Some(raw.id.clone()),
        user_id: user_id.to_string(),
        title: raw.summary.clone(),
        description: raw.description.clone(),
        start,
        end,
        last_modified: updated,
        origin: EventOrigin::External,
        sync_status: SyncStatus::Synced,
    })
}

/// Map a local event to the external shape for push, fixing the timezone
/// label to the deployment's configured zone.
pub fn to_external(event: &LocalEvent, zone: Tz) -> RemoteEvent {
    RemoteEvent {
        id: event.external_id.clone().unwrap_or_default(),
        summary: event.title.clone(),
        description: event.description.clone(),
        start: Some(RemoteTime::Zoned {
            datetime: event.start,
            tzid: zone.name().to_string(),
        }),
        end: Some(RemoteTime::Zoned {
            datetime: event.end,
            tzid: zone.name().to_string(),
        }),
        updated: Some(event.last_modified),
    }
}

fn resolve_instant(time: Option<&RemoteTime>) -> Option<chrono::DateTime<Utc>> {
    time.and_then(RemoteTime::to_instant)
}
