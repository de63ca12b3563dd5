//! dubsync-hs library interface
//!
//! History sync service for DubSync: reconciles the remote room's paginated
//! playback history into the local store, persists live room events, and
//! exposes the operational HTTP trigger.
//!
//! Exposed as a library so integration tests can drive the router and the
//! sync engine directly.

pub mod api;
pub mod db;
pub mod error;
pub mod live;
pub mod source;
pub mod sync;

pub use crate::api::{build_router, AppState};
pub use crate::error::{ApiError, ApiResult};
