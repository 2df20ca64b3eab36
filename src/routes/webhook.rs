//! Webhook receipt endpoint
//!
//! The provider expects a fast acknowledgement, so the pull runs on its own
//! task and the response never waits for it.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::debug;

use crate::routes::ErrorResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/google", post(receive))
}

/// POST /webhook/google - Receive a push notification
async fn receive(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let channel_id = header(&headers, "x-goog-channel-id");
    let resource_id = header(&headers, "x-goog-resource-id");

    let (Some(channel_id), Some(resource_id)) = (channel_id, resource_id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "missing notification headers".to_string(),
            }),
        )
            .into_response();
    };

    if let Some(resource_state) = header(&headers, "x-goog-resource-state") {
        debug!(channel_id = %channel_id, resource_state = %resource_state, "notification received");
    }

    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        dispatcher.on_notification(&channel_id, &resource_id).await;
    });

    StatusCode::OK.into_response()
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}
