//! Track queries
//!
//! Natural key: `(origin, external_id)`. The same song uploaded twice
//! under different external ids is two tracks by design.

use dubsync_common::db::{Origin, Track};
use dubsync_common::{Error, Result};
use sqlx::SqliteConnection;

/// Fields required to insert or update a track.
#[derive(Debug, Clone)]
pub struct NewTrack<'a> {
    pub duration_secs: i64,
    pub origin: Origin,
    pub external_id: &'a str,
    pub display_name: &'a str,
}

impl NewTrack<'_> {
    fn validate(&self) -> Result<()> {
        if self.external_id.is_empty() {
            return Err(Error::Validation("track external_id is empty".into()));
        }
        if self.display_name.is_empty() {
            return Err(Error::Validation("track display_name is empty".into()));
        }
        if self.duration_secs < 0 {
            return Err(Error::Validation(format!(
                "track duration is negative: {}",
                self.duration_secs
            )));
        }
        Ok(())
    }
}

/// Look a track up by its `(origin, external_id)` natural key.
pub async fn get_track(
    conn: &mut SqliteConnection,
    origin: Origin,
    external_id: &str,
) -> Result<Option<Track>> {
    let track = sqlx::query_as::<_, Track>(
        r#"
        SELECT id, duration_secs, origin, external_id, display_name
        FROM tracks WHERE origin = ? AND external_id = ?
        "#,
    )
    .bind(origin)
    .bind(external_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(track)
}

/// Insert a track; on natural-key conflict, update the mutable fields and
/// return the resulting row.
pub async fn upsert_track(
    conn: &mut SqliteConnection,
    track: &NewTrack<'_>,
) -> Result<Option<Track>> {
    track.validate()?;
    let row = sqlx::query_as::<_, Track>(
        r#"
        INSERT INTO tracks (duration_secs, origin, external_id, display_name)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(origin, external_id) DO UPDATE SET
            duration_secs = excluded.duration_secs,
            display_name = excluded.display_name
        RETURNING id, duration_secs, origin, external_id, display_name
        "#,
    )
    .bind(track.duration_secs)
    .bind(track.origin)
    .bind(track.external_id)
    .bind(track.display_name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Get a track by natural key, creating it if absent.
pub async fn get_or_create_track(
    conn: &mut SqliteConnection,
    track: &NewTrack<'_>,
) -> Result<Track> {
    if let Some(existing) = get_track(&mut *conn, track.origin, track.external_id).await? {
        return Ok(existing);
    }
    if let Some(created) = upsert_track(&mut *conn, track).await? {
        return Ok(created);
    }
    tracing::error!(
        origin = track.origin.as_str(),
        external_id = track.external_id,
        "Failed to save track"
    );
    Err(Error::Persistence(format!(
        "Impossible to save track {}#{}",
        track.origin.as_str(),
        track.external_id
    )))
}
