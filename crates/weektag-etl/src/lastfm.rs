//! Last.fm API client.
//!
//! Covers the three calls the weekly run needs: `user.getRecentTracks` for
//! the listening history and `track.getTopTags` / `artist.getTopTags` for
//! folksonomy tags. Response bodies are decoded into private typed records
//! at this boundary; anything that does not fit becomes a [`FetchError`]
//! instead of a missing field further down the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use weektag_core::ListeningEvent;

use crate::error::{FetchError, FetchResult};
use crate::resilience::{history_backoff, RateLimiter};
use crate::source::{HistoryRequest, HistorySource, TagSource};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

const SOURCE_NAME: &str = "Last.fm";

/// Last.fm error code for "invalid parameters", returned for unknown
/// tracks, artists and users.
const ERROR_INVALID_PARAMETERS: i64 = 6;

/// Last.fm error code for "rate limit exceeded".
const ERROR_RATE_LIMIT: i64 = 29;

// ---------------------------------------------------------------------------
// API response types (private -- Last.fm nests JSON awkwardly)
// ---------------------------------------------------------------------------

/// Last.fm collapses one-element arrays into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct TopTagsResponse {
    toptags: TopTags,
}

#[derive(Debug, Deserialize)]
struct TopTags {
    #[serde(default)]
    tag: OneOrMany<LastFmTag>,
}

#[derive(Debug, Deserialize)]
struct LastFmTag {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracks,
}

/// Plays stay raw here and are decoded one at a time, so a single odd
/// record cannot sink the whole page.
#[derive(Debug, Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: OneOrMany<Value>,
}

#[derive(Debug, Deserialize)]
struct RecentTrack {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artist: Option<RecentArtist>,
    /// Absent for the track currently playing.
    #[serde(default)]
    date: Option<PlayDate>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecentArtist {
    Object {
        #[serde(rename = "#text", default)]
        text: String,
    },
    Name(String),
    Number(serde_json::Number),
}

impl RecentArtist {
    fn into_name(self) -> String {
        match self {
            Self::Object { text } => text,
            Self::Name(name) => name,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlayDate {
    #[serde(default)]
    uts: Option<Value>,
}

impl PlayDate {
    /// `uts` is a numeric string in practice; accept a bare number too.
    fn timestamp(&self) -> Option<i64> {
        match self.uts.as_ref()? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Turn an HTTP status and body into JSON, mapping Last.fm error payloads
/// and non-2xx statuses to [`FetchError`]s.
fn parse_lastfm_body(status: StatusCode, body: &str) -> FetchResult<Value> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited {
            source_name: SOURCE_NAME.to_string(),
        });
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) if status.is_success() => {
            return Err(FetchError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: e.to_string(),
            })
        }
        Err(_) => {
            return Err(FetchError::Http {
                source_name: SOURCE_NAME.to_string(),
                message: format!("HTTP {status}"),
            })
        }
    };

    check_error_payload(&value)?;

    if !status.is_success() {
        return Err(FetchError::Http {
            source_name: SOURCE_NAME.to_string(),
            message: format!("HTTP {status}"),
        });
    }

    Ok(value)
}

/// Fail when `value` is a Last.fm error payload (`{"error": N, "message": ...}`).
fn check_error_payload(value: &Value) -> FetchResult<()> {
    let Some(code) = value.get("error") else {
        return Ok(());
    };
    let code = code.as_i64().unwrap_or_default();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Err(match code {
        ERROR_RATE_LIMIT => FetchError::RateLimited {
            source_name: SOURCE_NAME.to_string(),
        },
        ERROR_INVALID_PARAMETERS => FetchError::NotFound {
            entity: message,
            source_name: SOURCE_NAME.to_string(),
        },
        _ => FetchError::Api {
            source_name: SOURCE_NAME.to_string(),
            code,
            message,
        },
    })
}

/// Decode a `toptags` body into ranked, non-blank tag names.
fn decode_top_tags(value: Value) -> FetchResult<Vec<String>> {
    let response: TopTagsResponse = serde_json::from_value(value).map_err(|e| FetchError::Parse {
        source_name: SOURCE_NAME.to_string(),
        message: e.to_string(),
    })?;

    Ok(response
        .toptags
        .tag
        .into_vec()
        .into_iter()
        .map(|tag| tag.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

/// Decode a raw `user.getRecentTracks` body into listening events.
///
/// Plays without a completed-play timestamp (the track now playing),
/// plays with a blank artist or track, and plays whose record does not
/// decode are dropped individually. The result is sorted newest first. An
/// error payload or a body without a `recenttracks` object fails the
/// whole decode.
pub fn normalize_recent_tracks(raw: &Value) -> FetchResult<Vec<ListeningEvent>> {
    check_error_payload(raw)?;

    let response: RecentTracksResponse =
        serde_json::from_value(raw.clone()).map_err(|e| FetchError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })?;

    let mut events: Vec<ListeningEvent> = response
        .recenttracks
        .track
        .into_vec()
        .into_iter()
        .filter_map(|record| {
            let track: RecentTrack = match serde_json::from_value(record) {
                Ok(track) => track,
                Err(e) => {
                    log::debug!("Skipping undecodable Last.fm play: {}", e);
                    return None;
                }
            };
            let timestamp = track.date.as_ref()?.timestamp()?;
            let artist = track.artist.map(RecentArtist::into_name).unwrap_or_default();
            let name = track.name.unwrap_or_default();
            ListeningEvent::new(timestamp, artist, name).ok()
        })
        .collect();

    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(events)
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Last.fm API client.
///
/// Wraps an HTTP client, an API key, and a rate limiter. The Last.fm API
/// allows up to 5 requests per second for non-commercial use.
#[derive(Debug, Clone)]
pub struct LastFmClient {
    http: Client,
    api_key: String,
    base_url: String,
    rate_limiter: RateLimiter,
    history_retries: usize,
}

impl LastFmClient {
    /// Create a new Last.fm API client whose requests time out after
    /// `timeout`.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("weektag/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: LASTFM_API_BASE.to_string(),
            rate_limiter: RateLimiter::new(5),
            history_retries: 0,
        })
    }

    /// Point the client at another API root (a proxy or a local stub).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Retry transient history-fetch failures up to `retries` times.
    #[must_use]
    pub fn with_history_retries(mut self, retries: usize) -> Self {
        self.history_retries = retries;
        self
    }

    async fn call(&self, params: &[(&str, &str)]) -> FetchResult<Value> {
        self.rate_limiter.acquire().await;

        let response = self
            .http
            .get(&self.base_url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str()), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_lastfm_body(status, &body)
    }

    /// Get ranked top tag names for a track (`track.getTopTags`).
    pub async fn get_track_tags(&self, artist: &str, track: &str) -> FetchResult<Vec<String>> {
        let value = self
            .call(&[
                ("method", "track.getTopTags"),
                ("artist", artist),
                ("track", track),
                ("autocorrect", "1"),
            ])
            .await?;
        decode_top_tags(value)
    }

    /// Get ranked top tag names for an artist (`artist.getTopTags`).
    pub async fn get_artist_tags(&self, artist: &str) -> FetchResult<Vec<String>> {
        let value = self
            .call(&[
                ("method", "artist.getTopTags"),
                ("artist", artist),
                ("autocorrect", "1"),
            ])
            .await?;
        decode_top_tags(value)
    }

    /// Fetch one page of a user's recent tracks as the raw JSON body.
    ///
    /// Transient failures are retried with exponential backoff.
    pub async fn get_recent_tracks(&self, request: &HistoryRequest) -> FetchResult<Value> {
        let limit = request.limit.to_string();
        let from = request.range.from_ts.to_string();
        let to = request.range.to_ts.to_string();
        let params = [
            ("method", "user.getRecentTracks"),
            ("user", request.username.as_str()),
            ("limit", limit.as_str()),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ];

        (|| self.call(&params))
            .retry(history_backoff(self.history_retries))
            .when(FetchError::is_transient)
            .notify(|err: &FetchError, delay: Duration| {
                log::warn!(
                    "Last.fm history fetch failed ({}); retrying in {:?}",
                    err,
                    delay
                );
            })
            .await
    }
}

#[async_trait]
impl TagSource for LastFmClient {
    async fn track_tags(&self, artist: &str, track: &str) -> FetchResult<Vec<String>> {
        self.get_track_tags(artist, track).await
    }

    async fn artist_tags(&self, artist: &str) -> FetchResult<Vec<String>> {
        self.get_artist_tags(artist).await
    }
}

#[async_trait]
impl HistorySource for LastFmClient {
    async fn recent_tracks(&self, request: &HistoryRequest) -> FetchResult<Value> {
        self.get_recent_tracks(request).await
    }
}
