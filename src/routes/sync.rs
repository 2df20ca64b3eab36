//! Manual sync endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use calsync_core::sync_log::{SyncLogEntry, SyncReport};

use crate::routes::AppError;
use crate::state::AppState;

const STATUS_ENTRIES: usize = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync/push", post(push))
        .route("/sync/status/{user_id}", get(status))
}

#[derive(Deserialize)]
pub struct PushRequest {
    pub user_id: String,
    pub event_id: String,
}

/// POST /sync/push - Push a single local event to the provider
async fn push(
    State(state): State<AppState>,
    Json(request): Json<PushRequest>,
) -> Result<Json<SyncReport>, AppError> {
    let report = state.engine.push(&request.user_id, &request.event_id).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub user_id: String,
    pub entries: Vec<SyncLogEntry>,
}

/// GET /sync/status/:user_id - Recent sync attempts for a user
async fn status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let entries = state
        .store
        .recent_sync_entries(&user_id, STATUS_ENTRIES)
        .await?;

    Ok(Json(StatusResponse { user_id, entries }))
}
