//! History page walker
//!
//! Walks the remote source's pages in reverse chronological order, newest
//! first, accumulating every record more recent than the checkpoint.
//! Pages are atomic units of discovery: once a record at or before the
//! checkpoint is observed the walk stops, but only after the current page
//! has been consumed to the end.
//!
//! Deduplication: records are keyed by play instant truncated to seconds.
//! Pagination shifts while the room keeps playing, so adjacent pages
//! overlap; when two pages report the same instant the later-scanned page
//! wins. That is observed source behavior, not a stated guarantee.
//!
//! No retry here: transport errors fail the whole pass, which leaves the
//! checkpoint untouched.

use crate::source::HistorySource;
use dubsync_common::events::HistoryRecord;
use dubsync_common::Result;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Collect all history records strictly newer than `checkpoint` (epoch
/// seconds), ordered by play instant.
pub async fn collect_since<S: HistorySource + ?Sized>(
    source: &S,
    checkpoint: i64,
) -> Result<BTreeMap<i64, HistoryRecord>> {
    let mut records: BTreeMap<i64, HistoryRecord> = BTreeMap::new();
    let mut reached_checkpoint = false;

    info!(checkpoint, "Starting history page retrieval");

    for page in 1u64.. {
        debug!(
            page,
            collected = records.len(),
            checkpoint,
            "Retrieving history page"
        );

        let page_records = source.history_page(page).await?;
        if page_records.is_empty() {
            // Ran past the beginning of the room's history without ever
            // seeing the checkpoint.
            debug!(page, "Empty history page, stopping walk");
            break;
        }

        for record in page_records {
            let instant = record.play_instant();
            if instant <= checkpoint {
                reached_checkpoint = true;
            } else {
                records.insert(instant, record);
            }
        }

        if reached_checkpoint {
            break;
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::HistorySource;
    use async_trait::async_trait;
    use dubsync_common::events::{SongInfo, SourceUser};
    use dubsync_common::{Error, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(instant_secs: i64) -> HistoryRecord {
        HistoryRecord {
            played_ms: instant_secs * 1000,
            skipped: false,
            upvotes: 0,
            downvotes: 0,
            song: SongInfo {
                origin: "youtube".into(),
                external_id: format!("song-{instant_secs}"),
                name: format!("Song {instant_secs}"),
                duration_ms: 180_000,
            },
            user: SourceUser {
                external_id: "dt-1".into(),
                username: "alice".into(),
            },
        }
    }

    /// Canned pages, newest first, with a fetch counter.
    struct PagedSource {
        pages: Vec<Vec<HistoryRecord>>,
        fetches: AtomicUsize,
    }

    impl PagedSource {
        fn new(pages: Vec<Vec<HistoryRecord>>) -> Self {
            Self {
                pages,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HistorySource for PagedSource {
        async fn history_page(&self, page: u64) -> Result<Vec<HistoryRecord>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .pages
                .get((page - 1) as usize)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn stops_after_boundary_page_and_excludes_checkpointed_records() {
        // Records at 15..=9 split across two pages of four; checkpoint 10.
        let source = PagedSource::new(vec![
            vec![record(15), record(14), record(13), record(12)],
            vec![record(11), record(10), record(9)],
            vec![record(8)],
        ]);

        let records = collect_since(&source, 10).await.unwrap();

        let keys: Vec<i64> = records.keys().copied().collect();
        assert_eq!(keys, vec![11, 12, 13, 14, 15]);
        // Boundary page is finished, but no third fetch happens
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn boundary_page_is_always_consumed_whole() {
        // Checkpoint appears mid-page; the rest of that page must still be
        // scanned (and everything below the checkpoint dropped).
        let source = PagedSource::new(vec![vec![
            record(20),
            record(10),
            record(19),
            record(5),
        ]]);

        let records = collect_since(&source, 10).await.unwrap();
        let keys: Vec<i64> = records.keys().copied().collect();
        assert_eq!(keys, vec![19, 20]);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn later_page_overwrites_colliding_instant() {
        let mut shadowed = record(12);
        shadowed.song.external_id = "from-page-1".into();
        let mut winner = record(12);
        winner.song.external_id = "from-page-2".into();

        let source = PagedSource::new(vec![
            vec![record(15), record(14), shadowed],
            vec![winner, record(10)],
        ]);

        let records = collect_since(&source, 10).await.unwrap();
        assert_eq!(records[&12].song.external_id, "from-page-2");
    }

    #[tokio::test]
    async fn empty_first_page_yields_no_records() {
        let source = PagedSource::new(vec![]);
        let records = collect_since(&source, 10).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_errors_propagate_without_retry() {
        struct FailingSource {
            fetches: AtomicUsize,
        }

        #[async_trait]
        impl HistorySource for FailingSource {
            async fn history_page(&self, _page: u64) -> Result<Vec<HistoryRecord>> {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                Err(Error::RemoteSource("connection reset".to_string()))
            }
        }

        let source = FailingSource {
            fetches: AtomicUsize::new(0),
        };
        let result = collect_since(&source, 10).await;
        assert!(matches!(result, Err(Error::RemoteSource(_))));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }
}
