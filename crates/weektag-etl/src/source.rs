//! Seams to the external listening-history and tag services.
//!
//! The pipeline only talks to these traits; [`LastFmClient`] is the
//! production implementation and tests substitute in-memory fakes.
//!
//! [`LastFmClient`]: crate::lastfm::LastFmClient

use async_trait::async_trait;
use weektag_core::TimeRange;

use crate::error::FetchResult;

/// One history request: a user and a time window, fetched as a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub username: String,
    pub range: TimeRange,
    pub limit: u32,
}

/// Source of raw recent-track responses.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch the raw response body for `request`.
    ///
    /// The body is returned undecoded so it can be archived as-is; see
    /// [`crate::lastfm::normalize_recent_tracks`] for decoding.
    async fn recent_tracks(&self, request: &HistoryRequest) -> FetchResult<serde_json::Value>;
}

/// Source of community tags, ranked by the service.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Ranked tag names for a track.
    async fn track_tags(&self, artist: &str, track: &str) -> FetchResult<Vec<String>>;

    /// Ranked tag names for an artist.
    async fn artist_tags(&self, artist: &str) -> FetchResult<Vec<String>>;
}
