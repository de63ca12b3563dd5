//! Live event persistence
//!
//! The real-time counterpart of the backfill: the room's live stream
//! delivers the same logical facts one at a time, and each one is applied
//! in its own transaction through the same get-or-create primitives. The
//! backfill pass later reconciles anything this path missed while the
//! service was offline.

use crate::db::{
    get_latest_playback, get_or_create_playback, get_or_create_track, get_or_create_user,
    insert_user_action, NewPlayback, NewTrack, NewUser, NewUserAction,
};
use chrono::Utc;
use dubsync_common::db::{ActionKind, Origin};
use dubsync_common::events::{SongInfo, SourceEvent, SourceUser};
use dubsync_common::Result;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, warn};

/// Persist one live event inside its own transaction.
pub async fn record_live_event(pool: &SqlitePool, event: SourceEvent) -> Result<()> {
    let mut tx = pool.begin().await?;

    match event {
        SourceEvent::Playing {
            user,
            song,
            played_ms,
        } => ensure_playing(&mut tx, &user, &song, played_ms).await?,
        SourceEvent::Skip { user } => ensure_skip(&mut tx, &user).await?,
        SourceEvent::Vote {
            user,
            vote,
            played_ms,
        } => ensure_vote(&mut tx, &user, &vote, played_ms).await?,
    }

    tx.commit().await?;
    Ok(())
}

/// A new song started: make sure user, track and playback all exist.
async fn ensure_playing(
    conn: &mut SqliteConnection,
    user: &SourceUser,
    song: &SongInfo,
    played_ms: i64,
) -> Result<()> {
    let user = get_or_create_user(
        &mut *conn,
        &NewUser {
            external_id: &user.external_id,
            display_name: &user.username,
        },
    )
    .await?;

    let track = get_or_create_track(
        &mut *conn,
        &NewTrack {
            duration_secs: song.duration_ms / 1000,
            origin: Origin::parse(&song.origin)?,
            external_id: &song.external_id,
            display_name: &song.name,
        },
    )
    .await?;

    get_or_create_playback(
        &mut *conn,
        &NewPlayback {
            track_id: track.id,
            user_id: Some(user.id),
            start_time: played_ms / 1000,
        },
    )
    .await?;
    Ok(())
}

/// Somebody skipped: attribute a skip to the latest playback on record.
///
/// The stream does not say which playback got skipped; we rely on the
/// source sending the skip before the next playing event. If no playback
/// exists at all there is nothing to attach the skip to.
async fn ensure_skip(conn: &mut SqliteConnection, user: &SourceUser) -> Result<()> {
    let Some(playback) = get_latest_playback(&mut *conn).await? else {
        warn!(
            username = %user.username,
            "Skip event with no playback on record, dropping"
        );
        return Ok(());
    };

    let user = get_or_create_user(
        &mut *conn,
        &NewUser {
            external_id: &user.external_id,
            display_name: &user.username,
        },
    )
    .await?;

    insert_user_action(
        &mut *conn,
        &NewUserAction {
            ts: Utc::now().timestamp(),
            playback_id: playback.id,
            user_id: Some(user.id),
            kind: ActionKind::Skip,
        },
    )
    .await?;
    Ok(())
}

/// Somebody voted: attach the vote to the latest playback, but only when
/// the event's start instant matches it. Better to lose a vote than to
/// record it against the wrong playback.
async fn ensure_vote(
    conn: &mut SqliteConnection,
    user: &SourceUser,
    vote: &str,
    played_ms: i64,
) -> Result<()> {
    let kind = ActionKind::parse_vote(vote)?;

    let Some(playback) = get_latest_playback(&mut *conn).await? else {
        warn!(
            username = %user.username,
            "Vote event with no playback on record, dropping"
        );
        return Ok(());
    };

    if playback.start_time != played_ms / 1000 {
        error!(
            latest_start = playback.start_time,
            vote_start = played_ms / 1000,
            "Last saved playback does not match the playback this vote is for"
        );
        return Ok(());
    }

    let user = get_or_create_user(
        &mut *conn,
        &NewUser {
            external_id: &user.external_id,
            display_name: &user.username,
        },
    )
    .await?;

    insert_user_action(
        &mut *conn,
        &NewUserAction {
            ts: Utc::now().timestamp(),
            playback_id: playback.id,
            user_id: Some(user.id),
            kind,
        },
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::actions_for_playback;
    use crate::db::playbacks::get_playback;
    use crate::db::test_support::setup_test_db;
    use dubsync_common::Error;

    fn user() -> SourceUser {
        SourceUser {
            external_id: "dt-1".into(),
            username: "alice".into(),
        }
    }

    fn song() -> SongInfo {
        SongInfo {
            origin: "youtube".into(),
            external_id: "abc123".into(),
            name: "Dream Violin".into(),
            duration_ms: 204_000,
        }
    }

    fn playing(played_ms: i64) -> SourceEvent {
        SourceEvent::Playing {
            user: user(),
            song: song(),
            played_ms,
        }
    }

    #[tokio::test]
    async fn playing_event_creates_user_track_playback() {
        let pool = setup_test_db().await;
        record_live_event(&pool, playing(1_000_000)).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let playback = get_playback(&mut conn, 1_000).await.unwrap().unwrap();
        assert!(playback.user_id.is_some());
    }

    #[tokio::test]
    async fn vote_for_the_current_playback_is_recorded() {
        let pool = setup_test_db().await;
        record_live_event(&pool, playing(1_000_000)).await.unwrap();
        record_live_event(
            &pool,
            SourceEvent::Vote {
                user: user(),
                vote: "updub".into(),
                played_ms: 1_000_000,
            },
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let playback = get_playback(&mut conn, 1_000).await.unwrap().unwrap();
        let actions = actions_for_playback(&mut conn, playback.id).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Upvote);
        assert!(actions[0].user_id.is_some());
    }

    #[tokio::test]
    async fn vote_for_a_stale_playback_is_dropped() {
        let pool = setup_test_db().await;
        record_live_event(&pool, playing(1_000_000)).await.unwrap();
        record_live_event(&pool, playing(2_000_000)).await.unwrap();

        // Vote references the first playback, but a newer one started
        record_live_event(
            &pool,
            SourceEvent::Vote {
                user: user(),
                vote: "updub".into(),
                played_ms: 1_000_000,
            },
        )
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_actions")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn skip_event_attaches_to_the_latest_playback() {
        let pool = setup_test_db().await;
        record_live_event(&pool, playing(1_000_000)).await.unwrap();
        record_live_event(&pool, playing(2_000_000)).await.unwrap();
        record_live_event(&pool, SourceEvent::Skip { user: user() })
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let latest = get_playback(&mut conn, 2_000).await.unwrap().unwrap();
        let actions = actions_for_playback(&mut conn, latest.id).await.unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Skip);
    }

    #[tokio::test]
    async fn unknown_vote_tag_is_a_validation_error() {
        let pool = setup_test_db().await;
        record_live_event(&pool, playing(1_000_000)).await.unwrap();

        let result = record_live_event(
            &pool,
            SourceEvent::Vote {
                user: user(),
                vote: "sideways".into(),
                played_ms: 1_000_000,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
