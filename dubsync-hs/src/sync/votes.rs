//! Vote reconciliation
//!
//! The source reports aggregate up/down vote counts per play; the store
//! keeps discrete action rows. This module closes the numeric gap by
//! inserting exactly the missing number of unattributed vote rows, and
//! never deletes anything: a stored count above the reported one is a
//! data-integrity anomaly that gets logged and left alone.

use crate::db::{actions_for_playback, insert_user_action, simplify_actions, NewUserAction};
use dubsync_common::db::ActionKind;
use dubsync_common::Result;
use sqlx::SqliteConnection;
use tracing::error;

/// Bring the stored vote rows for `playback_id` in line with the reported
/// aggregates. Synthetic rows carry no user and are timestamped at the
/// record's play instant. Skip actions are never touched here: the source
/// does not report skips as countable votes.
pub async fn reconcile_votes(
    conn: &mut SqliteConnection,
    playback_id: i64,
    play_instant: i64,
    reported_upvotes: i64,
    reported_downvotes: i64,
) -> Result<()> {
    let history = actions_for_playback(&mut *conn, playback_id).await?;
    let current = simplify_actions(history);

    let polarities = [
        (ActionKind::Upvote, reported_upvotes),
        (ActionKind::Downvote, reported_downvotes),
    ];

    for (kind, reported) in polarities {
        let stored = current.iter().filter(|a| a.kind == kind).count() as i64;

        if stored == reported {
            continue;
        }
        if stored > reported {
            // Never delete; correction by removal would destroy the
            // append-only history.
            error!(
                playback_id,
                kind = kind.as_str(),
                stored,
                reported,
                "Stored vote count exceeds reported count, leaving rows untouched"
            );
            continue;
        }

        for _ in 0..(reported - stored) {
            insert_user_action(
                &mut *conn,
                &NewUserAction {
                    ts: play_instant,
                    playback_id,
                    user_id: None,
                    kind,
                },
            )
            .await?;
        }
    }

    Ok(())
}
