use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::event::ListeningEvent;
use crate::persist;
use crate::provenance::DataSource;
use crate::tags;

/// The user a dataset belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
}

/// Inclusive time window covered by a dataset, epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from_ts: i64,
    pub to_ts: i64,
}

impl TimeRange {
    /// The `days`-long window ending at `now`.
    ///
    /// The start never goes before the Unix epoch.
    #[must_use]
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        let to_ts = now.timestamp();
        let from_ts = Duration::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .map_or(0, |from| from.timestamp().max(0));
        Self { from_ts, to_ts }
    }
}

/// A week of tagged listening events, as written to `week_data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyDataset {
    /// Provenance marker: real history or demo substitute.
    pub source: DataSource,
    /// When the dataset was assembled, epoch seconds.
    pub generated_at: i64,
    pub user: UserInfo,
    pub range: TimeRange,
    pub scrobbles: Vec<ListeningEvent>,
}

impl WeeklyDataset {
    /// Read a dataset previously written with [`WeeklyDataset::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the dataset as pretty JSON, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        persist::write_json_atomic(path, self)
    }

    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let unique_songs = self
            .scrobbles
            .iter()
            .map(ListeningEvent::key)
            .collect::<HashSet<_>>()
            .len();
        let scrobbles_with_any_tags = self.scrobbles.iter().filter(|s| !s.tags.is_empty()).count();
        let scrobbles_with_real_tags = self
            .scrobbles
            .iter()
            .filter(|s| !s.tags.is_empty() && !tags::is_fallback(&s.tags))
            .count();

        DatasetSummary {
            source: self.source,
            scrobble_count: self.scrobbles.len(),
            unique_songs,
            scrobbles_with_any_tags,
            scrobbles_with_real_tags,
        }
    }
}

/// Counters reported after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub source: DataSource,
    pub scrobble_count: usize,
    pub unique_songs: usize,
    pub scrobbles_with_any_tags: usize,
    /// Scrobbles whose tags are not just the fallback tag.
    pub scrobbles_with_real_tags: usize,
}

impl DatasetSummary {
    /// Share of scrobbles carrying real (non-fallback) tags, 0.0--1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn real_tag_coverage(&self) -> f64 {
        if self.scrobble_count == 0 {
            return 0.0;
        }
        self.scrobbles_with_real_tags as f64 / self.scrobble_count as f64
    }
}
