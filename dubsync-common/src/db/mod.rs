//! Database access for DubSync
//!
//! Schema initialization and row models. The entity query layer lives in
//! the service crate; this module owns what the tables look like.

pub mod init;
pub mod models;

pub use init::{init_database, init_schema};
pub use models::{ActionKind, Origin, Playback, StateEntry, Track, User, UserAction};
