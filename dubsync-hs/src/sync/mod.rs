//! History reconciliation engine
//!
//! The backfill path: walk the remote source backward page by page until
//! the checkpoint is reached, split the discovered records into chunks at
//! skip boundaries, commit each chunk in its own transaction concurrently,
//! and advance the checkpoint to the highest instant that is provably
//! durable.
//!
//! It is always safe to re-run a pass from the same checkpoint: every
//! write path is idempotent on natural keys.

pub mod chunk;
pub mod orchestrator;
pub mod retry;
pub mod votes;
pub mod walker;

pub use chunk::apply_chunk;
pub use orchestrator::persist_history;
pub use retry::with_retry;
pub use walker::collect_since;

use crate::db::{load_state, LAST_SYNCED_INSTANT};
use crate::source::HistorySource;
use dubsync_common::Result;
use sqlx::SqlitePool;
use tracing::{error, info};

/// Run one full reconciliation pass: load the checkpoint, walk the source
/// back to it, persist everything discovered, and report the new
/// watermark (`None` when the checkpoint could not advance).
pub async fn run_sync_pass<S: HistorySource + ?Sized>(
    pool: &SqlitePool,
    source: &S,
    max_attempts: u32,
) -> Result<Option<i64>> {
    let checkpoint: Option<i64> = {
        let mut conn = pool.acquire().await?;
        load_state(&mut conn, LAST_SYNCED_INSTANT).await?
    };

    let Some(checkpoint) = checkpoint else {
        // Without a checkpoint the walk has no floor and would page back
        // through the room's entire lifetime. Operators seed the first
        // value through the state endpoint.
        error!("There is no recorded last synced instant; seed one before syncing");
        return Ok(None);
    };

    let records = collect_since(source, checkpoint).await?;
    info!(
        checkpoint,
        records = records.len(),
        "History walk complete, persisting"
    );

    persist_history(pool, records, max_attempts).await
}
