//! Watch channel metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A push-notification subscription registered with the provider.
///
/// At most one active channel exists per (user, calendar); renewal stops
/// the old channel before creating its replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchChannel {
    /// Opaque unique token we generated when creating the channel.
    pub channel_id: String,
    pub user_id: String,
    pub calendar_id: String,
    /// Provider-side identifier of the watched resource.
    pub resource_id: String,
    pub expiration: DateTime<Utc>,
}
