//! Remote history source boundary
//!
//! The page walker only needs one operation from the remote room: "give me
//! history page N, newest first". Everything wire-level hides behind
//! [`HistorySource`] so the engine can be driven by the HTTP client in
//! production and by canned pages in tests.

mod http;

pub use http::HttpHistorySource;

use async_trait::async_trait;
use dubsync_common::events::HistoryRecord;
use dubsync_common::Result;

/// Paginated, reverse-chronological feed of playback history.
///
/// Page numbering starts at 1 (the most recent page). Implementations do
/// not retry: transport failures propagate to the caller and fail the
/// whole sync pass, which is the intended behavior. A pass that cannot
/// see the source must not advance the checkpoint.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch one page of history records, newest first within the page.
    /// An empty page means the walk ran past the beginning of history.
    async fn history_page(&self, page: u64) -> Result<Vec<HistoryRecord>>;
}
