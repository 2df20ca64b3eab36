//! The sync engine: pull and push reconciliation against the local store.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{info, warn};

use calsync_core::error::{SyncError, SyncResult};
use calsync_core::locks::KeyedLocks;
use calsync_core::mapper;
use calsync_core::provider::{CalendarProvider, ProviderError};
use calsync_core::remote::RemoteEvent;
use calsync_core::store::Store;
use calsync_core::sync_log::{SyncDirection, SyncLogEntry, SyncOutcome, SyncReport};
use calsync_core::SyncStatus;

use crate::credentials::CredentialManager;

pub struct SyncEngine {
    store: Arc<dyn Store>,
    provider: Arc<dyn CalendarProvider>,
    credentials: Arc<CredentialManager>,
    /// Per-user locks: pulls take the exclusive side, pushes the shared
    /// side, so pushes overlap each other but never a pull.
    locks: KeyedLocks<String>,
    calendar_id: String,
    zone: Tz,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn CalendarProvider>,
        credentials: Arc<CredentialManager>,
        calendar_id: String,
        zone: Tz,
    ) -> Self {
        SyncEngine {
            store,
            provider,
            credentials,
            locks: KeyedLocks::new(),
            calendar_id,
            zone,
        }
    }

    /// Pull events from the provider and reconcile them into the local
    /// store, incrementally when `sync_token` is given, else a full
    /// listing.
    ///
    /// Per-event failures are counted without aborting the batch. A failure
    /// of the credential or listing step aborts the pull; `SyncTokenExpired`
    /// tells the caller to retry with no token. Every outcome, completed or
    /// aborted, is appended to the sync log before returning.
    pub async fn pull(&self, user_id: &str, sync_token: Option<&str>) -> SyncResult<SyncReport> {
        let _guard = self.locks.exclusive(&user_id.to_string()).await;

        let result = self.pull_locked(user_id, sync_token).await;
        self.append_log(user_id, SyncDirection::Pull, &result).await;

        match &result {
            Ok(report) => info!(
                user_id,
                events = report.events_processed,
                errors = report.errors_count,
                incremental = sync_token.is_some(),
                "pull complete"
            ),
            Err(err) => warn!(user_id, error = %err, "pull aborted"),
        }
        result
    }

    async fn pull_locked(
        &self,
        user_id: &str,
        sync_token: Option<&str>,
    ) -> SyncResult<SyncReport> {
        let credential = self.credentials.get_valid(user_id).await?;

        let page = self
            .provider
            .list_events(&credential.access_token, &self.calendar_id, sync_token)
            .await
            .map_err(|err| match err {
                ProviderError::TokenExpired => SyncError::SyncTokenExpired,
                other => SyncError::Provider(other),
            })?;

        let mut report = SyncReport {
            sync_token: page.next_sync_token,
            ..Default::default()
        };

        for raw in &page.events {
            match self.reconcile(user_id, raw).await {
                Ok(()) => report.events_processed += 1,
                Err(err) => {
                    report.errors_count += 1;
                    report
                        .error_details
                        .push(format!("event '{}': {}", raw.id, err));
                }
            }
        }

        Ok(report)
    }

    /// Create-or-update a single external event, matching on external id
    /// only.
    async fn reconcile(&self, user_id: &str, raw: &RemoteEvent) -> SyncResult<()> {
        let mapped = mapper::from_external(user_id, raw)?;

        match self.store.event_by_external_id(user_id, &raw.id).await? {
            Some(mut existing) => {
                existing.title = mapped.title;
                existing.description = mapped.description;
                existing.start = mapped.start;
                existing.end = mapped.end;
                existing.last_modified = mapped.last_modified;
                existing.sync_status = SyncStatus::Synced;
                self.store.update_event(&existing).await?;
            }
            None => self.store.insert_event(&mapped).await?,
        }
        Ok(())
    }

    /// Push a single local event to the provider: insert when it has no
    /// external id, update otherwise. The local row is only touched after
    /// the provider call succeeds.
    pub async fn push(&self, user_id: &str, local_event_id: &str) -> SyncResult<SyncReport> {
        let _guard = self.locks.shared(&user_id.to_string()).await;

        let result = self.push_locked(user_id, local_event_id).await;
        self.append_log(user_id, SyncDirection::Push, &result).await;

        match &result {
            Ok(_) => info!(user_id, local_event_id, "push complete"),
            Err(err) => warn!(user_id, local_event_id, error = %err, "push failed"),
        }
        result
    }

    async fn push_locked(
        &self,
        user_id: &str,
        local_event_id: &str,
    ) -> SyncResult<SyncReport> {
        let mut event = self
            .store
            .event_by_local_id(local_event_id)
            .await?
            .filter(|e| e.user_id == user_id)
            .ok_or_else(|| SyncError::NotFound(format!("event '{}'", local_event_id)))?;

        let credential = self.credentials.get_valid(user_id).await?;
        let raw = mapper::to_external(&event, self.zone);

        let pushed = match event.external_id.as_deref() {
            Some(external_id) => {
                self.provider
                    .update_event(&credential.access_token, &self.calendar_id, external_id, &raw)
                    .await?
            }
            None => {
                self.provider
                    .insert_event(&credential.access_token, &self.calendar_id, &raw)
                    .await?
            }
        };

        // Record the provider-assigned id (it can change on update too).
        if !pushed.id.is_empty() {
            event.external_id = Some(pushed.id);
        }
        event.sync_status = SyncStatus::Synced;
        event.last_modified = Utc::now();
        self.store.update_event(&event).await?;

        Ok(SyncReport {
            events_processed: 1,
            ..Default::default()
        })
    }

    /// Append the operation's outcome to the sync log. Best-effort: a
    /// failed append is logged but never masks the sync result.
    async fn append_log(
        &self,
        user_id: &str,
        direction: SyncDirection,
        result: &SyncResult<SyncReport>,
    ) {
        let entry = match result {
            Ok(report) => SyncLogEntry {
                user_id: user_id.to_string(),
                direction,
                outcome: report.outcome(),
                events_processed: report.events_processed,
                errors_count: report.errors_count,
                error_details: report.error_details.clone(),
                sync_token: report.sync_token.clone(),
                completed_at: Utc::now(),
            },
            Err(err) => SyncLogEntry {
                user_id: user_id.to_string(),
                direction,
                outcome: SyncOutcome::Error,
                events_processed: 0,
                errors_count: 1,
                error_details: vec![err.to_string()],
                sync_token: None,
                completed_at: Utc::now(),
            },
        };

        if let Err(log_err) = self.store.append_sync_log(&entry).await {
            warn!(user_id, error = %log_err, "failed to append sync log entry");
        }
    }
}
