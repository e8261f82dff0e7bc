//! Per-song tag resolution.
//!
//! A song is resolved by ordered fallthrough: track tags, then artist tags,
//! then the local `untagged` fallback. Each step produces an explicit
//! [`TagLookup`]; a failed or empty step simply hands over to the next one,
//! so resolution itself can never fail or come back empty.

use std::fmt;

use weektag_core::tags;

use crate::error::{FetchError, FetchResult};
use crate::source::TagSource;

/// Default number of tags kept from each source.
pub const DEFAULT_TOP_N: usize = 5;

/// Outcome of one lookup step.
#[derive(Debug)]
pub enum TagLookup {
    /// The source returned at least one tag (already capped to top-N).
    Found(Vec<String>),
    /// The source answered but had no tags.
    Empty,
    /// Transport, service or decoding failure.
    Failed(FetchError),
}

impl TagLookup {
    fn from_result(result: FetchResult<Vec<String>>, top_n: usize) -> Self {
        match result {
            Ok(mut tags) => {
                tags.truncate(top_n);
                if tags.is_empty() {
                    Self::Empty
                } else {
                    Self::Found(tags)
                }
            }
            Err(e) => Self::Failed(e),
        }
    }

    #[must_use]
    pub fn into_found(self) -> Option<Vec<String>> {
        match self {
            Self::Found(tags) => Some(tags),
            Self::Empty | Self::Failed(_) => None,
        }
    }
}

/// Which step produced a song's tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOrigin {
    Track,
    Artist,
    Fallback,
}

impl fmt::Display for TagOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Track => "track",
            Self::Artist => "artist",
            Self::Fallback => "fallback",
        })
    }
}

/// Resolved tags for one song. `tags` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tags: Vec<String>,
    pub origin: TagOrigin,
}

/// Resolves the tags of a single (artist, track) pair against a
/// [`TagSource`].
#[derive(Clone, Copy)]
pub struct TagResolver<'a> {
    source: &'a dyn TagSource,
    top_n: usize,
}

impl fmt::Debug for TagResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagResolver")
            .field("top_n", &self.top_n)
            .finish_non_exhaustive()
    }
}

impl<'a> TagResolver<'a> {
    /// A resolver keeping at most `top_n` tags per source (at least one).
    pub fn new(source: &'a dyn TagSource, top_n: usize) -> Self {
        Self {
            source,
            top_n: top_n.max(1),
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub async fn lookup_track(&self, artist: &str, track: &str) -> TagLookup {
        TagLookup::from_result(self.source.track_tags(artist, track).await, self.top_n)
    }

    pub async fn lookup_artist(&self, artist: &str) -> TagLookup {
        TagLookup::from_result(self.source.artist_tags(artist).await, self.top_n)
    }

    /// Resolve tags for a song. Never fails and never returns an empty list.
    pub async fn resolve(&self, artist: &str, track: &str) -> Resolution {
        let track_lookup = self.lookup_track(artist, track).await;
        log_lookup(&track_lookup, "track", artist, track);
        if let Some(tags) = track_lookup.into_found() {
            return Resolution {
                tags,
                origin: TagOrigin::Track,
            };
        }

        let artist_lookup = self.lookup_artist(artist).await;
        log_lookup(&artist_lookup, "artist", artist, track);
        if let Some(tags) = artist_lookup.into_found() {
            return Resolution {
                tags,
                origin: TagOrigin::Artist,
            };
        }

        Resolution {
            tags: tags::fallback_tags(),
            origin: TagOrigin::Fallback,
        }
    }
}

fn log_lookup(lookup: &TagLookup, scope: &str, artist: &str, track: &str) {
    match lookup {
        TagLookup::Found(_) => {}
        TagLookup::Empty => {
            log::debug!("No {} tags for {} - {}", scope, artist, track);
        }
        TagLookup::Failed(e) => {
            log::warn!(
                "Failed to get Last.fm {} tags for {} - {}: {}",
                scope,
                artist,
                track,
                e
            );
        }
    }
}
