//! Reconciliation pass trigger

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::api::AppState;
use crate::error::ApiResult;
use crate::sync::run_sync_pass;

/// Response for a completed sync pass
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    /// Epoch seconds of the new checkpoint, absent when nothing advanced
    pub watermark: Option<i64>,
}

/// POST /sync
///
/// Runs one reconciliation pass against the remote source and reports the
/// resulting watermark. The pass is synchronous: the response arrives once
/// every chunk has settled and the checkpoint is final.
pub async fn trigger_sync(State(state): State<AppState>) -> ApiResult<Json<SyncResponse>> {
    info!("Reconciliation pass triggered via API");
    let watermark = run_sync_pass(&state.db, state.source.as_ref(), state.max_attempts).await?;
    Ok(Json(SyncResponse { watermark }))
}

/// Build sync routes
pub fn sync_routes() -> Router<AppState> {
    Router::new().route("/sync", post(trigger_sync))
}
