//! # DubSync Common Library
//!
//! Shared code for the DubSync services including:
//! - Database models, schema initialization
//! - Live event types (SourceEvent enum) and history record types
//! - Error taxonomy
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
