//! Reconciliation orchestrator
//!
//! Splits walked history into chunks at skip boundaries, commits the
//! chunks concurrently, and advances the checkpoint to the last instant
//! that is provably durable.
//!
//! Chunk commits race freely: no ordering is imposed on execution, only on
//! watermark selection. A later chunk may well commit while an earlier one
//! fails, so the checkpoint only follows the longest unbroken prefix of
//! successes; past that point durability is uncertain and the next pass
//! must revisit it (harmless, every write is idempotent).

use crate::db::{save_state, LAST_SYNCED_INSTANT};
use crate::sync::chunk::apply_chunk;
use crate::sync::retry::with_retry;
use dubsync_common::events::HistoryRecord;
use dubsync_common::Result;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// One unit of commit work: a run of records ending at a skip boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Play instant of the chunk's last record.
    pub key: i64,
    /// Whether the chunk ends at a non-skipped record. A trailing run of
    /// skipped records has no successor yet: it is committed, but its skip
    /// actions cannot be written until a successor appears, so the
    /// checkpoint must stay below it for the next pass to re-walk it.
    pub closed: bool,
    pub records: Vec<HistoryRecord>,
}

/// How one chunk's commit went, in ascending key order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkOutcome {
    pub key: i64,
    pub closed: bool,
    pub succeeded: bool,
}

/// Persist walked history and return the new watermark, `None` when no
/// closed chunk could be committed (checkpoint stays untouched).
pub async fn persist_history(
    pool: &SqlitePool,
    records: BTreeMap<i64, HistoryRecord>,
    max_attempts: u32,
) -> Result<Option<i64>> {
    let chunks = split_chunks(records);
    if chunks.is_empty() {
        info!("No new history records to persist");
        return Ok(None);
    }

    info!(chunks = chunks.len(), "Saving history chunks in database");

    // Fan out: one task per chunk, each with its own pooled connection
    let mut keyed_handles = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let pool = pool.clone();
        let key = chunk.key;
        let closed = chunk.closed;
        let handle = tokio::spawn(async move {
            let context = format!("commit history chunk ending at {}", chunk.key);
            with_retry(max_attempts, &context, || apply_chunk(&pool, &chunk.records)).await
        });
        keyed_handles.push(((key, closed), handle));
    }

    // Fan in: nothing below runs until every chunk has settled
    let (meta, handles): (Vec<_>, Vec<_>) = keyed_handles.into_iter().unzip();
    let results = futures::future::join_all(handles).await;

    let mut outcomes = Vec::with_capacity(meta.len());
    for ((key, closed), result) in meta.into_iter().zip(results) {
        let succeeded = match result {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                error!(chunk = key, error = %err, "Saving chunk failed");
                false
            }
            Err(join_err) => {
                error!(chunk = key, error = %join_err, "Chunk task panicked");
                false
            }
        };
        outcomes.push(ChunkOutcome {
            key,
            closed,
            succeeded,
        });
    }

    let watermark = safe_watermark(&outcomes);
    match watermark {
        Some(instant) => {
            info!(instant, "Successfully saved history up to instant");
            let mut conn = pool.acquire().await?;
            save_state(&mut conn, LAST_SYNCED_INSTANT, &instant).await?;
        }
        None => {
            if outcomes.first().map_or(false, |o| o.succeeded) {
                info!("No closed chunk committed yet, checkpoint not advanced");
            } else {
                error!("First history chunk failed, checkpoint not advanced");
            }
        }
    }
    Ok(watermark)
}

/// Partition records (ascending by instant) into chunks that each end at a
/// non-skipped record; a trailing run of skipped records becomes a final
/// open chunk.
pub fn split_chunks(records: BTreeMap<i64, HistoryRecord>) -> Vec<Chunk> {
    // Grouping: [ ][ ][s][s][ ][s][ ]
    //           \-/\-/\-------/\----/
    let mut chunks = Vec::new();
    let mut current: Vec<HistoryRecord> = Vec::new();
    let mut last_key = 0;

    for (key, record) in records {
        let close = !record.skipped;
        current.push(record);
        last_key = key;
        if close {
            chunks.push(Chunk {
                key: last_key,
                closed: true,
                records: std::mem::take(&mut current),
            });
        }
    }
    if !current.is_empty() {
        chunks.push(Chunk {
            key: last_key,
            closed: false,
            records: current,
        });
    }

    debug!(chunks = chunks.len(), "Partitioned history into chunks");
    chunks
}

/// The key of the last *closed* chunk within the unbroken prefix of
/// successes, scanning in ascending key order. `None` when the first chunk
/// failed, or when no closed chunk exists in the prefix.
pub fn safe_watermark(outcomes: &[ChunkOutcome]) -> Option<i64> {
    let mut watermark = None;
    for outcome in outcomes {
        if !outcome.succeeded {
            break;
        }
        if outcome.closed {
            watermark = Some(outcome.key);
        }
    }
    watermark
}
