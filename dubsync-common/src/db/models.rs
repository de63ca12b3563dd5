//! Database models

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Source backend a track came from.
///
/// The remote service currently supports exactly two; anything else on the
/// wire is rejected at the store boundary rather than stored as free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Origin {
    Youtube,
    Soundcloud,
}

impl Origin {
    /// Parse a wire tag into an origin, rejecting unknown tags.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "youtube" => Ok(Origin::Youtube),
            "soundcloud" => Ok(Origin::Soundcloud),
            other => Err(Error::Validation(format!("Unknown track origin: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Youtube => "youtube",
            Origin::Soundcloud => "soundcloud",
        }
    }
}

/// Kind of action a user can take against a playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ActionKind {
    Skip,
    Upvote,
    Downvote,
}

impl ActionKind {
    /// Parse a wire vote tag into an action kind.
    ///
    /// The source spells votes several ways depending on the endpoint.
    /// Skip is deliberately absent: the source never reports a skip as a
    /// countable vote.
    pub fn parse_vote(tag: &str) -> Result<Self> {
        match tag {
            "upvote" | "updub" | "updubs" => Ok(ActionKind::Upvote),
            "downvote" | "downdub" | "downdubs" => Ok(ActionKind::Downvote),
            other => Err(Error::Validation(format!("Unknown vote tag: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Skip => "skip",
            ActionKind::Upvote => "upvote",
            ActionKind::Downvote => "downvote",
        }
    }
}

/// A user seen in the room. `external_id` is the durable identity; the
/// display name follows whatever the source last reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub external_id: String,
    pub display_name: String,
    pub country: Option<String>,
}

/// A track, unique per `(origin, external_id)`. The same song re-uploaded
/// under a different external id is a distinct track on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Track {
    pub id: i64,
    pub duration_secs: i64,
    pub origin: Origin,
    pub external_id: String,
    pub display_name: String,
}

/// One concrete play of a track. `start_time` (epoch seconds) is unique:
/// no two plays start at the identical instant.
///
/// `user_id` is optional because history gathered after the fact may not
/// attribute who queued the track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Playback {
    pub id: i64,
    pub track_id: i64,
    pub user_id: Option<i64>,
    pub start_time: i64,
}

/// An action (skip/upvote/downvote) against a playback. Append-only: rows
/// are never deleted, correction happens by inserting newer rows, and the
/// "current" state per `(user_id, playback_id)` is the row with the
/// maximum `ts`.
///
/// `user_id` is optional: votes reconstructed from aggregate history
/// counts have no attributable user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAction {
    pub id: i64,
    /// When the action happened, epoch seconds. Skips gathered from
    /// history carry the start instant of the *next* song, the only
    /// timestamp the source gives us for them.
    pub ts: i64,
    pub playback_id: i64,
    pub user_id: Option<i64>,
    pub kind: ActionKind,
}

/// A row of the generic key/value state table (JSON-encoded values).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StateEntry {
    pub key: String,
    pub value: String,
}
