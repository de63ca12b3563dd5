//! Entity query layer
//!
//! Natural-key idempotent create-or-update primitives over the four
//! entities, plus the generic key/value state store. Every function takes
//! a `&mut SqliteConnection` so that a caller performing a multi-step
//! operation can thread one transaction through all of them; callers that
//! do not care acquire a connection from the pool themselves.
//!
//! The `get_or_create_*` composition is the workhorse of both the backfill
//! and the live path: get by natural key, fall back to upsert, and treat
//! "neither path yielded a row" as a store-level bug (`Persistence` error),
//! never as an expected outcome.

pub mod actions;
pub mod playbacks;
pub mod state;
pub mod tracks;
pub mod users;

pub use actions::{
    actions_for_playback, insert_user_action, playback_has_skip, simplify_actions, NewUserAction,
};
pub use playbacks::{get_latest_playback, get_or_create_playback, NewPlayback};
pub use state::{load_state, save_state, LAST_SYNCED_INSTANT};
pub use tracks::{get_or_create_track, NewTrack};
pub use users::{get_or_create_user, NewUser};

#[cfg(test)]
pub(crate) mod test_support {
    use dubsync_common::db::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// In-memory pool pinned to one connection: every pooled connection of
    /// an in-memory SQLite database is a separate database, so the schema
    /// only exists on the connection that created it.
    pub async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }
}
