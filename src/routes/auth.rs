//! OAuth connect endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use calsync_core::oauth;

use crate::channels::DEFAULT_CALENDAR_ID;
use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(begin))
        .route("/auth/google/callback", get(callback))
}

#[derive(Deserialize)]
pub struct BeginParams {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct BeginResponse {
    pub authorize_url: String,
}

/// GET /auth/google?user_id=... - Build the consent URL for a user
async fn begin(
    State(state): State<AppState>,
    Query(params): Query<BeginParams>,
) -> Result<Json<BeginResponse>, AppError> {
    let oauth_state = oauth::encode_state(&params.user_id)?;

    Ok(Json(BeginResponse {
        authorize_url: state.provider.authorize_url(&oauth_state),
    }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub user_id: String,
    pub connected: bool,
    pub watch_channel: Option<String>,
}

/// GET /auth/google/callback - Exchange the code and start watching
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>, AppError> {
    let user_id = oauth::decode_state(&params.state)?;

    state.credentials.connect(&user_id, &params.code).await?;

    // Best-effort initial channel; the connection stands even if the
    // subscription has to wait for the renewal job.
    let watch_channel = match state
        .channels
        .create_channel(&user_id, DEFAULT_CALENDAR_ID)
        .await
    {
        Ok(channel_id) => Some(channel_id),
        Err(err) => {
            warn!(user_id = %user_id, error = %err, "could not create initial watch channel");
            None
        }
    };

    Ok(Json(CallbackResponse {
        user_id,
        connected: true,
        watch_channel,
    }))
}
