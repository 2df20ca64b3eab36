//! Server configuration.
//!
//! Loaded from a TOML file, by default at:
//!   ~/.config/calsync/config.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    pub google: GoogleConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Google OAuth client credentials (user-provided).
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Public callback address registered on watch channels.
    pub webhook_url: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    /// Deployment timezone used as the label on pushed events.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub renew_interval_secs: u64,
    pub resync_interval_secs: u64,
    /// Channels expiring within this window get renewed.
    pub renew_threshold_hours: i64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        JobsConfig {
            renew_interval_secs: 3600,
            resync_interval_secs: 86400,
            renew_threshold_hours: 24,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:4280".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("calsync")
            .join("config.toml"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            anyhow::bail!(
                "Config not found.\n\n\
                Create {} with:\n\n\
                [google]\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\
                redirect_uri = \"https://your-host/auth/google/callback\"\n\n\
                [sync]\n\
                webhook_url = \"https://your-host/webhook/google\"\n\
                timezone = \"Europe/Rome\"",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        Ok(config)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.sync
            .timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid timezone '{}'", self.sync.timezone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [google]
        client_id = "client-1"
        client_secret = "secret"
        redirect_uri = "https://sync.example.com/auth/google/callback"

        [sync]
        webhook_url = "https://sync.example.com/webhook/google"
        timezone = "Europe/Rome"
    "#;

    #[test]
    fn parses_with_defaults() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.bind, "127.0.0.1:4280");
        assert_eq!(config.sync.calendar_id, "primary");
        assert_eq!(config.jobs.renew_threshold_hours, 24);
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Rome);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let mut config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.sync.timezone = "Mars/OlympusMons".to_string();
        assert!(config.timezone().is_err());
    }
}
