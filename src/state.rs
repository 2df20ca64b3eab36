//! Shared application state.

use std::sync::Arc;

use anyhow::Result;

use calsync_core::provider::CalendarProvider;
use calsync_core::store::{MemoryStore, Store};
use calsync_provider_google::{GoogleCalendarProvider, OauthConfig};

use crate::channels::WatchChannelManager;
use crate::config::AppConfig;
use crate::credentials::CredentialManager;
use crate::sync::SyncEngine;
use crate::webhook::WebhookDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub provider: Arc<dyn CalendarProvider>,
    pub credentials: Arc<CredentialManager>,
    pub channels: Arc<WatchChannelManager>,
    pub engine: Arc<SyncEngine>,
    pub dispatcher: Arc<WebhookDispatcher>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = Arc::new(GoogleCalendarProvider::new(OauthConfig {
            client_id: config.google.client_id.clone(),
            client_secret: config.google.client_secret.clone(),
            redirect_uri: config.google.redirect_uri.clone(),
        })?);

        // The bundled store; any relational backend can stand in through
        // the Store trait.
        let store = Arc::new(MemoryStore::new());
        Self::assemble(store, provider, config)
    }

    fn assemble(
        store: Arc<dyn Store>,
        provider: Arc<dyn CalendarProvider>,
        config: &AppConfig,
    ) -> Result<Self> {
        let zone = config.timezone()?;
        let credentials = Arc::new(CredentialManager::new(store.clone(), provider.clone()));
        let channels = Arc::new(WatchChannelManager::new(
            store.clone(),
            provider.clone(),
            credentials.clone(),
            config.sync.webhook_url.clone(),
        ));
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            provider.clone(),
            credentials.clone(),
            config.sync.calendar_id.clone(),
            zone,
        ));
        let dispatcher = Arc::new(WebhookDispatcher::new(store.clone(), engine.clone()));

        Ok(AppState {
            store,
            provider,
            credentials,
            channels,
            engine,
            dispatcher,
        })
    }
}
