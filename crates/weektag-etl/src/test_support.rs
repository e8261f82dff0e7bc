//! In-memory fakes for the tag and history services.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{FetchError, FetchResult};
use crate::source::{HistoryRequest, HistorySource, TagSource};

/// Canned answer of a fake source.
#[derive(Debug, Clone)]
pub enum Reply {
    Tags(Vec<String>),
    Fail,
}

impl Reply {
    pub fn tags(tags: &[&str]) -> Self {
        Self::Tags(tags.iter().map(|t| (*t).to_string()).collect())
    }

    fn into_result(self) -> FetchResult<Vec<String>> {
        match self {
            Self::Tags(tags) => Ok(tags),
            Self::Fail => Err(FetchError::Http {
                source_name: "fake".to_string(),
                message: "connection reset".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Track(String, String),
    Artist(String),
}

/// Tag source answering from fixed tables; unknown songs have no tags.
#[derive(Debug, Default)]
pub struct FakeTagSource {
    track: HashMap<(String, String), Reply>,
    artist: HashMap<String, Reply>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTagSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(mut self, artist: &str, track: &str, reply: Reply) -> Self {
        self.track
            .insert((artist.to_string(), track.to_string()), reply);
        self
    }

    pub fn with_artist(mut self, artist: &str, reply: Reply) -> Self {
        self.artist.insert(artist.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn track_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Track(..)))
            .count()
    }

    pub fn artist_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Artist(..)))
            .count()
    }
}

#[async_trait]
impl TagSource for FakeTagSource {
    async fn track_tags(&self, artist: &str, track: &str) -> FetchResult<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Track(artist.to_string(), track.to_string()));
        self.track
            .get(&(artist.to_string(), track.to_string()))
            .cloned()
            .unwrap_or(Reply::Tags(Vec::new()))
            .into_result()
    }

    async fn artist_tags(&self, artist: &str) -> FetchResult<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Artist(artist.to_string()));
        self.artist
            .get(artist)
            .cloned()
            .unwrap_or(Reply::Tags(Vec::new()))
            .into_result()
    }
}

/// History source returning a fixed body, or failing.
#[derive(Debug)]
pub struct FakeHistory(pub Option<Value>);

#[async_trait]
impl HistorySource for FakeHistory {
    async fn recent_tracks(&self, _request: &HistoryRequest) -> FetchResult<Value> {
        self.0.clone().ok_or_else(|| FetchError::Http {
            source_name: "fake".to_string(),
            message: "unreachable".to_string(),
        })
    }
}
