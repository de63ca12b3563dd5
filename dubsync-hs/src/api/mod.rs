//! HTTP API handlers for dubsync-hs
//!
//! Operational surface only: trigger a reconciliation pass, inspect or
//! overwrite sync state, health check. The state endpoints can rewrite the
//! checkpoint, which is destructive if misused; deploy this service
//! behind access control.

pub mod health;
pub mod state;
pub mod sync;

pub use health::health_routes;
pub use state::state_routes;
pub use sync::sync_routes;

use crate::source::HistorySource;
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Remote history source used by sync passes
    pub source: Arc<dyn HistorySource>,
    /// Total attempts the retry wrapper gives each chunk commit
    pub max_attempts: u32,
}

impl AppState {
    pub fn new(db: SqlitePool, source: Arc<dyn HistorySource>, max_attempts: u32) -> Self {
        Self {
            db,
            source,
            max_attempts,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(sync_routes())
        .merge(state_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
