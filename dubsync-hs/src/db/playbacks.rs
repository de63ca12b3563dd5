//! Playback queries
//!
//! Natural key: `start_time` (epoch seconds). The system assumes no two
//! plays start at the identical instant. Rows are created once and never
//! mutated afterwards; the upsert's conflict arm exists so that racing
//! chunks converge on the same row instead of erroring.

use dubsync_common::db::Playback;
use dubsync_common::{Error, Result};
use sqlx::SqliteConnection;

/// Fields required to insert a playback.
#[derive(Debug, Clone)]
pub struct NewPlayback {
    pub track_id: i64,
    /// Absent when historical data does not attribute who played it.
    pub user_id: Option<i64>,
    /// Start instant, epoch seconds.
    pub start_time: i64,
}

impl NewPlayback {
    fn validate(&self) -> Result<()> {
        if self.start_time <= 0 {
            return Err(Error::Validation(format!(
                "playback start_time is not a valid instant: {}",
                self.start_time
            )));
        }
        Ok(())
    }
}

/// Look a playback up by its start instant.
pub async fn get_playback(
    conn: &mut SqliteConnection,
    start_time: i64,
) -> Result<Option<Playback>> {
    let playback = sqlx::query_as::<_, Playback>(
        "SELECT id, track_id, user_id, start_time FROM playbacks WHERE start_time = ?",
    )
    .bind(start_time)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(playback)
}

/// The most recent playback on record, if any. The live path attaches
/// skips and votes to this row.
pub async fn get_latest_playback(conn: &mut SqliteConnection) -> Result<Option<Playback>> {
    let playback = sqlx::query_as::<_, Playback>(
        "SELECT id, track_id, user_id, start_time FROM playbacks ORDER BY start_time DESC LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?;
    Ok(playback)
}

/// Insert a playback; on start-time conflict, update the row and return it.
pub async fn upsert_playback(
    conn: &mut SqliteConnection,
    playback: &NewPlayback,
) -> Result<Option<Playback>> {
    playback.validate()?;
    let row = sqlx::query_as::<_, Playback>(
        r#"
        INSERT INTO playbacks (track_id, user_id, start_time)
        VALUES (?, ?, ?)
        ON CONFLICT(start_time) DO UPDATE SET
            track_id = excluded.track_id,
            user_id = excluded.user_id
        RETURNING id, track_id, user_id, start_time
        "#,
    )
    .bind(playback.track_id)
    .bind(playback.user_id)
    .bind(playback.start_time)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Get a playback by start instant, creating it if absent.
pub async fn get_or_create_playback(
    conn: &mut SqliteConnection,
    playback: &NewPlayback,
) -> Result<Playback> {
    if let Some(existing) = get_playback(&mut *conn, playback.start_time).await? {
        return Ok(existing);
    }
    if let Some(created) = upsert_playback(&mut *conn, playback).await? {
        return Ok(created);
    }
    tracing::error!(
        track_id = playback.track_id,
        start_time = playback.start_time,
        "Failed to save playback"
    );
    Err(Error::Persistence(format!(
        "Impossible to save playback track:{} start:{}",
        playback.track_id, playback.start_time
    )))
}
