//! Calendar v3 REST calls.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;
use url::Url;

use calsync_core::provider::{
    CalendarProvider, EventPage, ProviderError, TokenGrant, TokenRefresh, WatchHandle,
};
use calsync_core::remote::RemoteEvent;

use crate::convert::{google_from_remote, remote_from_google};
use crate::oauth::{self, OauthConfig};
use crate::types::{ErrorEnvelope, EventsPage, GoogleEvent, StopRequest, TokenResponse, WatchRequest};

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: &str = "250";

pub struct GoogleCalendarProvider {
    http: reqwest::Client,
    oauth: OauthConfig,
}

impl GoogleCalendarProvider {
    pub fn new(oauth: OauthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(GoogleCalendarProvider { http, oauth })
    }

    fn events_url(&self, calendar_id: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(API_BASE)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Transport("cannot build api url".to_string()))?
            .push("calendars")
            .push(calendar_id)
            .push("events");
        Ok(url)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, ProviderError> {
        let response = self
            .http
            .post(oauth::TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(transport)?;

        let response = check(response).await?;
        response.json::<TokenResponse>().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}

/// Turn a non-success response into a classified `ProviderError`, pulling
/// the message out of Google's error envelope when present.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(body);

    Err(ProviderError::from_status(status.as_u16(), message))
}

fn expires_at(expires_in: i64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::seconds(expires_in)
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    fn authorize_url(&self, state: &str) -> String {
        oauth::consent_url(&self.oauth, state)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        let tokens = self
            .token_request(&[
                ("code", code),
                ("client_id", &self.oauth.client_id),
                ("client_secret", &self.oauth.client_secret),
                ("redirect_uri", &self.oauth.redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let refresh_token = tokens.refresh_token.ok_or(ProviderError::Api {
            status: 200,
            message: "token response did not include a refresh token".to_string(),
        })?;

        Ok(TokenGrant {
            access_token: tokens.access_token,
            refresh_token,
            expires_at: expires_at(tokens.expires_in),
        })
    }

    async fn refresh_credentials(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefresh, ProviderError> {
        let tokens = self
            .token_request(&[
                ("refresh_token", refresh_token),
                ("client_id", &self.oauth.client_id),
                ("client_secret", &self.oauth.client_secret),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        // Google typically doesn't return a new refresh_token on refresh
        Ok(TokenRefresh {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.filter(|t| !t.is_empty()),
            expires_at: expires_at(tokens.expires_in),
        })
    }

    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        sync_token: Option<&str>,
    ) -> Result<EventPage, ProviderError> {
        let url = self.events_url(calendar_id)?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(url.clone())
                .bearer_auth(access_token)
                .query(&[("maxResults", PAGE_SIZE), ("singleEvents", "true")]);

            if let Some(token) = sync_token {
                request = request.query(&[("syncToken", token)]);
            }
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(transport)?;
            let page: EventsPage = check(response).await?.json().await.map_err(transport)?;

            events.extend(page.items.into_iter().map(remote_from_google));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => {
                    debug!(
                        count = events.len(),
                        incremental = sync_token.is_some(),
                        "listed events"
                    );
                    return Ok(EventPage {
                        events,
                        next_sync_token: page.next_sync_token,
                    });
                }
            }
        }
    }

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &RemoteEvent,
    ) -> Result<RemoteEvent, ProviderError> {
        let mut body: GoogleEvent = google_from_remote(event);
        // Let the API assign the id.
        body.id = String::new();

        let response = self
            .http
            .post(self.events_url(calendar_id)?)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let created: GoogleEvent = check(response).await?.json().await.map_err(transport)?;
        Ok(remote_from_google(created))
    }

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &RemoteEvent,
    ) -> Result<RemoteEvent, ProviderError> {
        let mut url = self.events_url(calendar_id)?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Transport("cannot build api url".to_string()))?
            .push(event_id);

        let body = google_from_remote(event);
        let response = self
            .http
            .put(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let updated: GoogleEvent = check(response).await?.json().await.map_err(transport)?;
        Ok(remote_from_google(updated))
    }

    async fn create_watch(
        &self,
        access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        callback_url: &str,
        expiration: DateTime<Utc>,
    ) -> Result<WatchHandle, ProviderError> {
        let mut url = self.events_url(calendar_id)?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Transport("cannot build api url".to_string()))?
            .push("watch");

        let body = WatchRequest {
            id: channel_id.to_string(),
            kind: "web_hook".to_string(),
            address: callback_url.to_string(),
            expiration: expiration.timestamp_millis(),
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let watch: crate::types::WatchResponse =
            check(response).await?.json().await.map_err(transport)?;

        // The API echoes the granted lifetime as stringified millis; it may
        // be shorter than requested.
        let granted = watch
            .expiration
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or(expiration);

        Ok(WatchHandle {
            resource_id: watch.resource_id,
            expiration: granted,
        })
    }

    async fn stop_watch(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<(), ProviderError> {
        let url = format!("{}/channels/stop", API_BASE);
        let body = StopRequest {
            id: channel_id.to_string(),
            resource_id: resource_id.to_string(),
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        check(response).await?;
        Ok(())
    }
}
