//! Chunk transaction processor
//!
//! Applies one contiguous, time-ordered run of history records inside a
//! single transaction. Failure of any step rolls the whole chunk back and
//! propagates to the retry wrapper; a committed chunk is the unit the
//! orchestrator's watermark reasons about.

use crate::db::{
    get_or_create_playback, get_or_create_track, get_or_create_user, insert_user_action,
    playback_has_skip, NewPlayback, NewTrack, NewUser, NewUserAction,
};
use crate::sync::votes::reconcile_votes;
use dubsync_common::db::{ActionKind, Origin};
use dubsync_common::events::HistoryRecord;
use dubsync_common::Result;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

/// Apply one chunk of records as a single atomic unit of work.
///
/// Per record, in chronological order:
/// 1. if the *previous* record in the chunk was skipped, record a skip
///    against its playback, timestamped at the current record's instant
///    (the source reports a skip only implicitly, by the next song starting)
/// 2. get-or-create the user
/// 3. get-or-create the track (wire durations are milliseconds)
/// 4. get-or-create the playback
/// 5. reconcile votes against the reported aggregates
///
/// A chunk whose final record is itself skipped records no skip action for
/// that record in this pass: there is no successor to borrow a timestamp
/// from. The orchestrator holds the checkpoint below such a record, so the
/// next pass re-walks it together with its successor.
pub async fn apply_chunk(pool: &SqlitePool, records: &[HistoryRecord]) -> Result<()> {
    let mut conn = pool.acquire().await?;

    // Take the write lock up front. sqlx transactions default to a
    // deferred BEGIN; a reader that later upgrades to writer while a
    // sibling chunk holds the lock gets SQLITE_BUSY immediately, without
    // the busy timeout ever being consulted. BEGIN IMMEDIATE makes
    // contending chunks queue on the timeout instead.
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    if let Err(err) = apply_records(&mut conn, records).await {
        // The chunk error is the one worth surfacing, not any rollback
        // failure on top of it
        let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
        return Err(err);
    }

    sqlx::query("COMMIT").execute(&mut *conn).await?;

    if let Some(record) = records.last() {
        debug!(
            last_instant = record.play_instant(),
            records = records.len(),
            "Committed history chunk"
        );
    }
    Ok(())
}

async fn apply_records(conn: &mut SqliteConnection, records: &[HistoryRecord]) -> Result<()> {
    let mut previous: Option<(&HistoryRecord, i64)> = None;
    for record in records {
        let play_instant = record.play_instant();

        if let Some((previous_record, previous_playback_id)) = previous {
            if previous_record.skipped {
                ensure_skip_recorded(&mut *conn, previous_playback_id, play_instant).await?;
            }
        }

        let user = get_or_create_user(
            &mut *conn,
            &NewUser {
                external_id: &record.user.external_id,
                display_name: &record.user.username,
            },
        )
        .await?;

        let track = get_or_create_track(
            &mut *conn,
            &NewTrack {
                duration_secs: record.song.duration_ms / 1000,
                origin: Origin::parse(&record.song.origin)?,
                external_id: &record.song.external_id,
                display_name: &record.song.name,
            },
        )
        .await?;

        let playback = get_or_create_playback(
            &mut *conn,
            &NewPlayback {
                track_id: track.id,
                user_id: Some(user.id),
                start_time: play_instant,
            },
        )
        .await?;

        reconcile_votes(
            &mut *conn,
            playback.id,
            play_instant,
            record.upvotes,
            record.downvotes,
        )
        .await?;

        previous = Some((record, playback.id));
    }
    Ok(())
}

/// Ensure exactly one skip action exists for `playback_id`, inserting an
/// unattributed one at `skip_instant` if none is recorded yet.
pub async fn ensure_skip_recorded(
    conn: &mut SqliteConnection,
    playback_id: i64,
    skip_instant: i64,
) -> Result<()> {
    if playback_has_skip(&mut *conn, playback_id).await? {
        return Ok(());
    }
    insert_user_action(
        &mut *conn,
        &NewUserAction {
            ts: skip_instant,
            playback_id,
            user_id: None,
            kind: ActionKind::Skip,
        },
    )
    .await?;
    Ok(())
}
