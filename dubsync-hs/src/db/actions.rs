//! User action queries
//!
//! Append-only: actions are never updated or deleted. A user changing
//! their vote inserts a new row, and the "current" state per
//! `(user_id, playback_id)` is the row with the maximum timestamp. The
//! collapse of the full history down to current state lives in
//! [`simplify_actions`].

use dubsync_common::db::{ActionKind, UserAction};
use dubsync_common::{Error, Result};
use sqlx::SqliteConnection;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Fields required to insert a user action.
#[derive(Debug, Clone)]
pub struct NewUserAction {
    /// When the action happened, epoch seconds.
    pub ts: i64,
    pub playback_id: i64,
    /// Absent for actions reconstructed from aggregate history counts.
    pub user_id: Option<i64>,
    pub kind: ActionKind,
}

impl NewUserAction {
    fn validate(&self) -> Result<()> {
        if self.ts <= 0 {
            return Err(Error::Validation(format!(
                "action ts is not a valid instant: {}",
                self.ts
            )));
        }
        if self.playback_id <= 0 {
            return Err(Error::Validation(format!(
                "action playback_id is not a valid id: {}",
                self.playback_id
            )));
        }
        Ok(())
    }
}

/// Append one action row.
pub async fn insert_user_action(
    conn: &mut SqliteConnection,
    action: &NewUserAction,
) -> Result<UserAction> {
    action.validate()?;
    let row = sqlx::query_as::<_, UserAction>(
        r#"
        INSERT INTO user_actions (ts, playback_id, user_id, kind)
        VALUES (?, ?, ?, ?)
        RETURNING id, ts, playback_id, user_id, kind
        "#,
    )
    .bind(action.ts)
    .bind(action.playback_id)
    .bind(action.user_id)
    .bind(action.kind)
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or_else(|| {
        tracing::error!(
            playback_id = action.playback_id,
            kind = action.kind.as_str(),
            "Failed to save user action"
        );
        Error::Persistence(format!(
            "Impossible to save {} action for playback {}",
            action.kind.as_str(),
            action.playback_id
        ))
    })
}

/// All action rows ever recorded against a playback, oldest first.
pub async fn actions_for_playback(
    conn: &mut SqliteConnection,
    playback_id: i64,
) -> Result<Vec<UserAction>> {
    let rows = sqlx::query_as::<_, UserAction>(
        r#"
        SELECT id, ts, playback_id, user_id, kind
        FROM user_actions WHERE playback_id = ?
        ORDER BY ts, id
        "#,
    )
    .bind(playback_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Whether any skip action exists for the playback.
pub async fn playback_has_skip(conn: &mut SqliteConnection, playback_id: i64) -> Result<bool> {
    let id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM user_actions WHERE playback_id = ? AND kind = 'skip' LIMIT 1",
    )
    .bind(playback_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id.is_some())
}

/// Collapse the append-only action history to the "simplified" current set.
///
/// Per attributed user, only the most recent row survives (ties broken by
/// insertion order, the higher row id). Unattributed rows each stand
/// alone: they were synthesized one-per-missing-vote from aggregate
/// counts, so collapsing them together would undercount.
pub fn simplify_actions(rows: Vec<UserAction>) -> Vec<UserAction> {
    let mut per_user: BTreeMap<i64, UserAction> = BTreeMap::new();
    let mut unattributed = Vec::new();

    for row in rows {
        match row.user_id {
            None => unattributed.push(row),
            Some(user_id) => match per_user.entry(user_id) {
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get();
                    if (row.ts, row.id) > (current.ts, current.id) {
                        slot.insert(row);
                    }
                }
            },
        }
    }

    let mut result: Vec<UserAction> = per_user.into_values().collect();
    result.extend(unattributed);
    result
}
