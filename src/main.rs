mod channels;
mod config;
mod credentials;
mod jobs;
mod routes;
mod state;
mod sync;
#[cfg(test)]
mod testing;
mod webhook;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use clap::Parser;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::jobs::Scheduler;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "calsync-server", about = "Calendar sync service")]
struct Cli {
    /// Path to the config file (defaults to ~/.config/calsync/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("calsync_server=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let state = AppState::new(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(
        state.engine.clone(),
        state.channels.clone(),
        state.store.clone(),
        Duration::from_secs(config.jobs.renew_interval_secs),
        Duration::from_secs(config.jobs.resync_interval_secs),
        chrono::Duration::hours(config.jobs.renew_threshold_hours),
        shutdown_rx,
    );
    let scheduler_handle = tokio::spawn(scheduler.run());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::auth::router())
        .merge(routes::webhook::router())
        .merge(routes::sync::router())
        .with_state(state)
        .layer(cors);

    info!(bind = %config.bind, "calsync-server listening");

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // Let the scheduler finish its current per-user step, then stop.
    let _ = shutdown_tx.send(true);
    let _ = scheduler_handle.await;

    Ok(())
}
