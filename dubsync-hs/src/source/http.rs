//! HTTP client for the remote room's history API

use async_trait::async_trait;
use dubsync_common::events::{HistoryRecord, SongInfo, SourceUser};
use dubsync_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

use super::HistorySource;

const USER_AGENT: &str = "DubSync/0.1.0 (+https://github.com/dubsync/dubsync)";

/// Reqwest-backed [`HistorySource`] against the room's REST history
/// endpoint (`GET {base_url}/room/{room}/playlist/history?page=N`).
pub struct HttpHistorySource {
    http_client: reqwest::Client,
    base_url: String,
    room: String,
}

impl HttpHistorySource {
    pub fn new(base_url: &str, room: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::RemoteSource(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            room: room.to_string(),
        })
    }
}

#[async_trait]
impl HistorySource for HttpHistorySource {
    async fn history_page(&self, page: u64) -> Result<Vec<HistoryRecord>> {
        let url = format!(
            "{}/room/{}/playlist/history?page={}",
            self.base_url, self.room, page
        );

        tracing::debug!(page, url = %url, "Fetching history page");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::RemoteSource(format!("History page {} fetch failed: {}", page, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteSource(format!(
                "History page {} returned HTTP {}",
                page, status
            )));
        }

        let body: HistoryPageResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteSource(format!("History page {} parse failed: {}", page, e)))?;

        Ok(body.data.into_iter().map(WireRecord::into_record).collect())
    }
}

/// Envelope the source wraps every response in.
#[derive(Debug, Deserialize)]
struct HistoryPageResponse {
    data: Vec<WireRecord>,
}

/// One history item as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireRecord {
    played: i64,
    skipped: bool,
    updubs: i64,
    downdubs: i64,
    userid: String,
    #[serde(rename = "_song")]
    song: WireSong,
    #[serde(rename = "_user")]
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireSong {
    #[serde(rename = "type")]
    song_type: String,
    fkid: String,
    name: String,
    #[serde(rename = "songLength")]
    song_length: i64,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    username: String,
}

impl WireRecord {
    fn into_record(self) -> HistoryRecord {
        HistoryRecord {
            played_ms: self.played,
            skipped: self.skipped,
            upvotes: self.updubs,
            downvotes: self.downdubs,
            song: SongInfo {
                origin: self.song.song_type,
                external_id: self.song.fkid,
                name: self.song.name,
                duration_ms: self.song.song_length,
            },
            user: SourceUser {
                external_id: self.userid,
                username: self.user.username,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_record_maps_to_history_record() {
        let json = r#"
        {
            "played": 1480464322618,
            "skipped": false,
            "updubs": 1,
            "downdubs": 0,
            "userid": "57595c7a16c34f3d00b5ea8d",
            "_song": {
                "type": "youtube",
                "fkid": "eOwwLhMPRUE",
                "name": "Craig Armstrong - Dream Violin",
                "songLength": 204000
            },
            "_user": {
                "username": "masterofsoundtrack"
            }
        }
        "#;
        let wire: WireRecord = serde_json::from_str(json).unwrap();
        let record = wire.into_record();

        assert_eq!(record.play_instant(), 1_480_464_322);
        assert_eq!(record.song.origin, "youtube");
        assert_eq!(record.song.duration_ms, 204_000);
        assert_eq!(record.user.username, "masterofsoundtrack");
        assert!(!record.skipped);
        assert_eq!(record.upvotes, 1);
    }
}
