//! OAuth state round-tripping.
//!
//! The state value carried through the authorization redirect embeds the
//! user id. A malformed or empty state is rejected as `InvalidState`; the
//! callback must never guess which user a code belongs to.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

#[derive(Serialize, Deserialize)]
struct StatePayload {
    user_id: String,
}

pub fn encode_state(user_id: &str) -> SyncResult<String> {
    serde_json::to_string(&StatePayload {
        user_id: user_id.to_string(),
    })
    .map_err(|e| SyncError::InvalidState(e.to_string()))
}

pub fn decode_state(state: &str) -> SyncResult<String> {
    let payload: StatePayload =
        serde_json::from_str(state).map_err(|e| SyncError::InvalidState(e.to_string()))?;
    if payload.user_id.is_empty() {
        return Err(SyncError::InvalidState("empty user id".to_string()));
    }
    Ok(payload.user_id)
}
