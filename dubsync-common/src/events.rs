//! Event and record types shared between the backfill and live paths
//!
//! The remote room reports the same logical facts two ways: as paginated
//! history records (backfill) and as live events on its websocket stream.
//! Both shapes are modeled here so that the service crates agree on them.

use serde::{Deserialize, Serialize};

/// A user as attributed by the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUser {
    /// Stable identity from the remote source; usernames may change,
    /// this id never does.
    pub external_id: String,
    pub username: String,
}

/// Song metadata as reported by the remote source.
///
/// `origin` stays a raw wire tag here; it is validated into an
/// [`Origin`](crate::db::Origin) at the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongInfo {
    pub origin: String,
    pub external_id: String,
    pub name: String,
    pub duration_ms: i64,
}

/// One record from the paginated history feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Play start instant, epoch milliseconds.
    pub played_ms: i64,
    /// True when the room skipped this play before it finished.
    pub skipped: bool,
    /// Aggregate upvote count at the time the page was served.
    pub upvotes: i64,
    /// Aggregate downvote count at the time the page was served.
    pub downvotes: i64,
    pub song: SongInfo,
    pub user: SourceUser,
}

impl HistoryRecord {
    /// Play instant truncated to epoch seconds.
    ///
    /// This is the natural key the whole reconciliation engine works in:
    /// the page walker dedupes on it, playbacks store it, and the
    /// checkpoint records the highest one safely committed.
    pub fn play_instant(&self) -> i64 {
        self.played_ms / 1000
    }
}

/// Live events from the remote room's stream.
///
/// Closed set matched exhaustively by the live persistence handler; adding
/// a variant is a compile error everywhere it matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceEvent {
    /// A new song started playing.
    Playing {
        user: SourceUser,
        song: SongInfo,
        played_ms: i64,
    },

    /// Somebody skipped the current song.
    Skip { user: SourceUser },

    /// Somebody voted on the current song.
    Vote {
        user: SourceUser,
        /// Wire vote tag ("updub"/"downdub" and friends); validated into
        /// an action kind at the store boundary.
        vote: String,
        /// Start instant of the playback being voted on, epoch milliseconds.
        played_ms: i64,
    },
}
