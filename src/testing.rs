//! Scripted doubles and fixtures shared by the engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use calsync_core::credential::UserCredential;
use calsync_core::event::{EventOrigin, LocalEvent, SyncStatus};
use calsync_core::provider::{
    CalendarProvider, EventPage, ProviderError, TokenGrant, TokenRefresh, WatchHandle,
};
use calsync_core::remote::{RemoteEvent, RemoteTime};

/// A provider whose responses are scripted per call. Unscripted calls
/// succeed with deterministic defaults, and every call is recorded.
#[derive(Default)]
pub struct ScriptedProvider {
    pub refresh_calls: AtomicUsize,
    refresh_failure: Mutex<Option<ProviderError>>,
    exchange_failure: Mutex<Option<ProviderError>>,

    /// Sync tokens seen by `list_events`, in call order.
    pub list_requests: Mutex<Vec<Option<String>>>,
    list_responses: Mutex<VecDeque<Result<EventPage, ProviderError>>>,
    list_delay: Mutex<Option<Duration>>,
    list_in_flight: AtomicUsize,
    pub max_list_in_flight: AtomicUsize,

    pub inserted: Mutex<Vec<RemoteEvent>>,
    insert_failure: Mutex<Option<ProviderError>>,
    pub updated: Mutex<Vec<(String, RemoteEvent)>>,
    update_failure: Mutex<Option<ProviderError>>,

    /// (calendar_id, channel_id) pairs passed to `create_watch`.
    pub watch_calls: Mutex<Vec<(String, String)>>,
    watch_failure: Mutex<Option<ProviderError>>,
    /// Channel ids passed to `stop_watch`.
    pub stop_calls: Mutex<Vec<String>>,
    stop_failure: Mutex<Option<ProviderError>>,
}

impl ScriptedProvider {
    pub fn fail_refresh_with(&self, err: ProviderError) {
        *self.refresh_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_exchange_with(&self, err: ProviderError) {
        *self.exchange_failure.lock().unwrap() = Some(err);
    }

    pub fn queue_list(&self, result: Result<EventPage, ProviderError>) {
        self.list_responses.lock().unwrap().push_back(result);
    }

    /// Make every listing take this long, to observe overlap.
    pub fn delay_lists(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_insert_with(&self, err: ProviderError) {
        *self.insert_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_update_with(&self, err: ProviderError) {
        *self.update_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_watch_with(&self, err: ProviderError) {
        *self.watch_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_stop_with(&self, err: ProviderError) {
        *self.stop_failure.lock().unwrap() = Some(err);
    }

    fn scripted(&self, slot: &Mutex<Option<ProviderError>>) -> Result<(), ProviderError> {
        match slot.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CalendarProvider for ScriptedProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://provider.test/consent?state={}", state)
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, ProviderError> {
        self.scripted(&self.exchange_failure)?;
        Ok(TokenGrant {
            access_token: "granted-access".to_string(),
            refresh_token: "granted-refresh".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }

    async fn refresh_credentials(
        &self,
        _refresh_token: &str,
    ) -> Result<TokenRefresh, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted(&self.refresh_failure)?;
        Ok(TokenRefresh {
            access_token: "refreshed-access".to_string(),
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }

    async fn list_events(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        sync_token: Option<&str>,
    ) -> Result<EventPage, ProviderError> {
        let call_number = {
            let mut requests = self.list_requests.lock().unwrap();
            requests.push(sync_token.map(String::from));
            requests.len()
        };

        let depth = self.list_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_list_in_flight.fetch_max(depth, Ordering::SeqCst);
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.list_in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.list_responses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(EventPage {
                events: vec![],
                next_sync_token: Some(format!("token-{}", call_number)),
            }),
        }
    }

    async fn insert_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event: &RemoteEvent,
    ) -> Result<RemoteEvent, ProviderError> {
        self.scripted(&self.insert_failure)?;
        let mut inserted = self.inserted.lock().unwrap();
        inserted.push(event.clone());
        let mut created = event.clone();
        created.id = format!("ext-{}", inserted.len());
        Ok(created)
    }

    async fn update_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event_id: &str,
        event: &RemoteEvent,
    ) -> Result<RemoteEvent, ProviderError> {
        self.scripted(&self.update_failure)?;
        self.updated
            .lock()
            .unwrap()
            .push((event_id.to_string(), event.clone()));
        let mut updated = event.clone();
        updated.id = event_id.to_string();
        Ok(updated)
    }

    async fn create_watch(
        &self,
        _access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        _callback_url: &str,
        expiration: DateTime<Utc>,
    ) -> Result<WatchHandle, ProviderError> {
        self.scripted(&self.watch_failure)?;
        self.watch_calls
            .lock()
            .unwrap()
            .push((calendar_id.to_string(), channel_id.to_string()));
        Ok(WatchHandle {
            resource_id: format!("res-{}", channel_id),
            expiration,
        })
    }

    async fn stop_watch(
        &self,
        _access_token: &str,
        channel_id: &str,
        _resource_id: &str,
    ) -> Result<(), ProviderError> {
        self.scripted(&self.stop_failure)?;
        self.stop_calls.lock().unwrap().push(channel_id.to_string());
        Ok(())
    }
}

pub fn connected_credential(user_id: &str, expiry: DateTime<Utc>) -> UserCredential {
    UserCredential {
        user_id: user_id.to_string(),
        access_token: "access-0".to_string(),
        refresh_token: "refresh-0".to_string(),
        expiry,
        connected: true,
    }
}

pub fn remote_event(id: &str, title: &str) -> RemoteEvent {
    let start = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
    RemoteEvent {
        id: id.to_string(),
        summary: title.to_string(),
        description: None,
        start: Some(RemoteTime::DateTime(start)),
        end: Some(RemoteTime::DateTime(start + chrono::Duration::hours(1))),
        updated: Some(start),
    }
}

/// A record that fails mapping: no `updated` timestamp.
pub fn malformed_remote_event(id: &str) -> RemoteEvent {
    let mut event = remote_event(id, "broken");
    event.updated = None;
    event
}

/// A locally authored event that has never been pushed.
pub fn pending_local_event(user_id: &str, title: &str) -> LocalEvent {
    let start = Utc.with_ymd_and_hms(2025, 6, 12, 14, 0, 0).unwrap();
    LocalEvent {
        local_id: Uuid::new_v4().to_string(),
        external_id: None,
        user_id: user_id.to_string(),
        title: title.to_string(),
        description: Some("added locally".to_string()),
        start,
        end: start + chrono::Duration::hours(1),
        last_modified: start,
        origin: EventOrigin::Local,
        sync_status: SyncStatus::Pending,
    }
}
