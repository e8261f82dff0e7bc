use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the artist and track halves of a key.
///
/// Tabs inside either field are folded to spaces during normalization, so
/// the separator never occurs in a normalized field.
pub const KEY_SEPARATOR: char = '\t';

/// Normalized identity of a song, used for deduplication and caching.
///
/// Built from the lowercased, trimmed artist and track names. Two plays whose
/// names differ only by case or surrounding whitespace share a key.
///
/// Lowercasing is Unicode-aware but no further canonicalization (NFC/NFKC,
/// diacritic folding) is applied: visually identical names written with
/// different code points produce different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongKey(String);

impl SongKey {
    #[must_use]
    pub fn new(artist: &str, track: &str) -> Self {
        let mut key = normalize_part(artist);
        key.push(KEY_SEPARATOR);
        key.push_str(&normalize_part(track));
        Self(key)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_part(value: &str) -> String {
    value.replace(KEY_SEPARATOR, " ").trim().to_lowercase()
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.split_once(KEY_SEPARATOR) {
            Some((artist, track)) => write!(f, "{artist} - {track}"),
            None => f.write_str(&self.0),
        }
    }
}
