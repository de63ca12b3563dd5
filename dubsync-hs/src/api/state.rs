//! Sync state inspection and override
//!
//! Overwriting `last_synced_instant` changes where the next pass resumes
//! from; setting it too far back only costs a redundant (idempotent)
//! re-walk, but setting it forward silently skips history.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::api::AppState;
use crate::db::{load_state, save_state, LAST_SYNCED_INSTANT};
use crate::error::{ApiError, ApiResult};

/// Keys operators are allowed to touch through the API.
const KNOWN_KEYS: &[&str] = &[LAST_SYNCED_INSTANT];

fn check_key(key: &str) -> Result<(), ApiError> {
    if KNOWN_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Unknown state key: {}", key)))
    }
}

/// GET /state/:key
pub async fn get_state(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    check_key(&key)?;
    let mut conn = state.db.acquire().await.map_err(dubsync_common::Error::from)?;
    let value: Option<Value> = load_state(&mut conn, &key).await?;
    match value {
        Some(value) => Ok(Json(value)),
        None => Err(ApiError::NotFound(format!("State key never written: {}", key))),
    }
}

/// PUT /state/:key
pub async fn put_state(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> ApiResult<Json<Value>> {
    check_key(&key)?;
    let mut conn = state.db.acquire().await.map_err(dubsync_common::Error::from)?;
    save_state(&mut conn, &key, &value).await?;
    Ok(Json(value))
}

/// Build state routes
pub fn state_routes() -> Router<AppState> {
    Router::new().route("/state/:key", get(get_state).put(put_state))
}
