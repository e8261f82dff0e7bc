//! The weekly fetch run.
//!
//! history fetch → normalize → distinct songs → budgeted tag resolution →
//! cache persisted → tags attached → `week_data.json` written.
//!
//! Any failure on the history side (missing credentials, unreachable
//! service, malformed or empty response) swaps in the demo dataset. Only
//! local I/O failures on the output directories abort the run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use weektag_core::{persist, DatasetSummary, TagCache, TimeRange, UserInfo, WeeklyDataset};

use crate::assemble::{assemble, demo_dataset};
use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::lastfm::{normalize_recent_tracks, LastFmClient};
use crate::resolve::TagResolver;
use crate::schedule::{DedupScheduler, FetchBudget, ScheduleReport};
use crate::source::{HistoryRequest, HistorySource, TagSource};

/// Fallback reason recorded when the demo dataset was asked for.
pub const FORCED_DEMO_REASON: &str = "demo dataset requested";

/// Outcome of a weekly run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub dataset_path: PathBuf,
    pub summary: DatasetSummary,
    /// Present when real history was fetched and tagged.
    pub schedule: Option<ScheduleReport>,
    /// Why the demo dataset was used, when it was.
    pub fallback_reason: Option<String>,
}

/// Orchestrates one weekly run over configured sources.
pub struct WeeklyPipeline {
    config: Config,
    history: Option<Arc<dyn HistorySource>>,
    tags: Option<Arc<dyn TagSource>>,
    force_demo: bool,
}

impl std::fmt::Debug for WeeklyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeeklyPipeline")
            .field("config", &self.config)
            .field("has_history", &self.history.is_some())
            .field("has_tags", &self.tags.is_some())
            .field("force_demo", &self.force_demo)
            .finish()
    }
}

impl WeeklyPipeline {
    /// Build a pipeline talking to Last.fm with the configured credentials.
    ///
    /// Without credentials no client is created and the run produces the
    /// demo dataset.
    pub fn new(config: Config) -> Self {
        let client = config.credentials().and_then(|(api_key, _)| {
            match LastFmClient::new(api_key, config.request_timeout()) {
                Ok(client) => Some(Arc::new(client.with_history_retries(config.history_retries))),
                Err(e) => {
                    log::warn!("Failed to create Last.fm client: {}", e);
                    None
                }
            }
        });

        let history = client.clone().map(|c| c as Arc<dyn HistorySource>);
        let tags = client.map(|c| c as Arc<dyn TagSource>);
        Self {
            config,
            history,
            tags,
            force_demo: false,
        }
    }

    /// Use explicit history and tag sources instead of the Last.fm client.
    #[must_use]
    pub fn with_sources(mut self, history: Arc<dyn HistorySource>, tags: Arc<dyn TagSource>) -> Self {
        self.history = Some(history);
        self.tags = Some(tags);
        self
    }

    /// Skip the network entirely and write the demo dataset.
    #[must_use]
    pub fn force_demo(mut self, force: bool) -> Self {
        self.force_demo = force;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the week ending at `now`.
    ///
    /// # Errors
    /// Fails only when the output directories cannot be created or the
    /// dataset file cannot be written.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        for dir in [&self.config.out_dir, &self.config.raw_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        let range = TimeRange::last_days(now, self.config.window_days);
        let fetched = if self.force_demo {
            log::info!("Demo dataset requested; Last.fm is not contacted");
            Err(FORCED_DEMO_REASON.to_string())
        } else {
            self.fetch_week(range).await.map_err(|e| {
                if matches!(e, FetchError::MissingCredentials(_)) {
                    log::warn!("{}; writing demo dataset", e);
                } else {
                    log::warn!("Last.fm fetch failed, falling back to demo dataset: {}", e);
                }
                e.to_string()
            })
        };

        let (dataset, schedule, fallback_reason) = match fetched {
            Ok((dataset, schedule)) => (dataset, Some(schedule), None),
            Err(reason) => {
                let demo = demo_dataset(
                    self.config.lastfm_user.as_deref(),
                    now,
                    self.config.window_days,
                );
                (demo, None, Some(reason))
            }
        };

        let dataset_path = self.config.dataset_path();
        dataset
            .save(&dataset_path)
            .with_context(|| format!("Failed to write {}", dataset_path.display()))?;

        let summary = dataset.summary();
        log::info!(
            "Wrote {} (source={}, scrobble_count={})",
            dataset_path.display(),
            summary.source,
            summary.scrobble_count
        );

        Ok(RunReport {
            dataset_path,
            summary,
            schedule,
            fallback_reason,
        })
    }

    async fn fetch_week(&self, range: TimeRange) -> FetchResult<(WeeklyDataset, ScheduleReport)> {
        let (_, username) = self.config.credentials().ok_or_else(|| {
            FetchError::MissingCredentials("LASTFM_API_KEY or LASTFM_USER is not set".to_string())
        })?;
        let (Some(history), Some(tags)) = (self.history.as_deref(), self.tags.as_deref()) else {
            return Err(FetchError::MissingCredentials(
                "no Last.fm client available".to_string(),
            ));
        };

        let request = HistoryRequest {
            username: username.to_string(),
            range,
            limit: self.config.page_limit,
        };
        let raw = history.recent_tracks(&request).await?;
        self.archive_raw_history(&raw);

        let events = normalize_recent_tracks(&raw)?;
        if events.is_empty() {
            return Err(FetchError::EmptyHistory {
                from_ts: range.from_ts,
                to_ts: range.to_ts,
            });
        }

        let cache_path = self.config.cache_path();
        let cache = TagCache::load(&cache_path);

        let scheduler = DedupScheduler::new(
            TagResolver::new(tags, self.config.top_n_tags),
            self.config.pacing(),
        );
        let mut budget = FetchBudget::new(self.config.fetch_budget);
        let (cache, schedule) = scheduler.run(&events, cache, &mut budget).await;

        if let Err(e) = cache.save(&cache_path) {
            log::warn!("Failed to save tag cache {}: {}", cache_path.display(), e);
        }

        let user = UserInfo {
            username: username.to_string(),
        };
        Ok((assemble(user, range, events, &cache), schedule))
    }

    /// Keep the untouched history response around for debugging.
    fn archive_raw_history(&self, raw: &serde_json::Value) {
        let path = self.config.raw_history_path();
        if let Err(e) = persist::write_json_atomic(&path, raw) {
            log::warn!("Failed to write {}: {}", path.display(), e);
        }
    }
}
