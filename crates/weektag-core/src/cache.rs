//! Durable song-key to tag-list cache.
//!
//! The cache is read once when a run starts and written once at the end.
//! Reading is permissive: a missing, unreadable or corrupt file yields an
//! empty cache so a bad file can never fail a run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::SongKey;
use crate::persist;
use crate::tags;

/// Mapping from [`SongKey`] to the ordered tags resolved for that song.
///
/// An entry with a non-empty list counts as resolved and is never fetched
/// again. An absent entry, or one holding an empty list, is eligible for a
/// (re)fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagCache {
    entries: BTreeMap<SongKey, Vec<String>>,
}

impl TagCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache at `path`, treating any failure as an empty cache.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No tag cache at {}; starting empty", path.display());
            return Self::new();
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(crate::Error::from)
            .and_then(|contents| Ok(serde_json::from_str::<Self>(&contents)?));

        match parsed {
            Ok(cache) => {
                log::debug!("Loaded {} cached tag entries from {}", cache.len(), path.display());
                cache
            }
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable tag cache {}: {}",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }

    /// Persist the cache to `path` (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        persist::write_json_atomic(path, self)
    }

    /// Tags stored for `key`, including an empty list.
    #[must_use]
    pub fn get(&self, key: &SongKey) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Tags for `key` only when the entry counts as resolved (non-empty).
    #[must_use]
    pub fn resolved(&self, key: &SongKey) -> Option<&[String]> {
        self.get(key).filter(|tags| !tags.is_empty())
    }

    /// Whether `key` has to be fetched to be resolved.
    #[must_use]
    pub fn needs_fetch(&self, key: &SongKey) -> bool {
        self.resolved(key).is_none()
    }

    /// Tags to attach to an event: the resolved entry, or the fallback set.
    #[must_use]
    pub fn tags_or_fallback(&self, key: &SongKey) -> Vec<String> {
        self.resolved(key)
            .map(<[String]>::to_vec)
            .unwrap_or_else(tags::fallback_tags)
    }

    pub fn insert(&mut self, key: SongKey, tags: Vec<String>) {
        self.entries.insert(key, tags);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn key(artist: &str, track: &str) -> SongKey {
        SongKey::new(artist, track)
    }

    #[test]
    fn test_empty_entry_needs_fetch() {
        let mut cache = TagCache::new();
        let k = key("Radiohead", "Airbag");
        assert!(cache.needs_fetch(&k));

        cache.insert(k.clone(), Vec::new());
        assert_eq!(cache.get(&k), Some(&[][..]));
        assert!(cache.resolved(&k).is_none());
        assert!(cache.needs_fetch(&k));

        cache.insert(k.clone(), vec!["rock".to_string()]);
        assert!(!cache.needs_fetch(&k));
    }

    #[test]
    fn test_tags_or_fallback() {
        let mut cache = TagCache::new();
        let hit = key("Radiohead", "Airbag");
        let empty = key("Burial", "Archangel");
        cache.insert(hit.clone(), vec!["rock".to_string(), "90s".to_string()]);
        cache.insert(empty.clone(), Vec::new());

        assert_eq!(cache.tags_or_fallback(&hit), vec!["rock", "90s"]);
        assert_eq!(cache.tags_or_fallback(&empty), vec!["untagged"]);
        assert_eq!(cache.tags_or_fallback(&key("a", "b")), vec!["untagged"]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = TagCache::load(&dir.path().join("tags_cache.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tags_cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(TagCache::load(&path).is_empty());

        // Valid JSON of the wrong shape is corrupt too.
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(TagCache::load(&path).is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tags_cache.json");
        let mut cache = TagCache::new();
        cache.insert(key("Radiohead", "Airbag"), vec!["rock".to_string()]);
        cache.insert(key("Burial", "Archangel"), Vec::new());

        cache.save(&path).unwrap();
        let loaded = TagCache::load(&path);
        assert_eq!(loaded, cache);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_file_is_plain_object() {
        let mut cache = TagCache::new();
        cache.insert(key("Air", "Alone in Kyoto"), vec!["chill".to_string()]);
        let value = serde_json::to_value(&cache).unwrap();
        assert_eq!(value["air\talone in kyoto"][0], "chill");
    }
}
