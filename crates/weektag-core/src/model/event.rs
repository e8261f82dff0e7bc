use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::key::SongKey;

/// One completed play (scrobble) of a track.
///
/// Events come out of history normalization without tags; the pipeline
/// attaches a non-empty tag list before the event is written to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningEvent {
    /// Play time, epoch seconds.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    pub artist: String,
    pub track: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ListeningEvent {
    /// Create an untagged event.
    ///
    /// # Errors
    /// Returns [`Error::InvalidData`] when the artist or track is blank.
    pub fn new(timestamp: i64, artist: impl Into<String>, track: impl Into<String>) -> Result<Self> {
        let artist = artist.into();
        let track = track.into();
        if artist.trim().is_empty() || track.trim().is_empty() {
            return Err(Error::InvalidData(format!(
                "event at {timestamp} has a blank artist or track"
            )));
        }
        Ok(Self {
            timestamp,
            artist,
            track,
            tags: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn key(&self) -> SongKey {
        SongKey::new(&self.artist, &self.track)
    }
}
