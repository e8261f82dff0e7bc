//! End-to-end tests for the weekly run.
//!
//! The Last.fm services are replaced by in-process fakes, so these tests
//! exercise dedup, budget, caching and the demo fallback without network
//! access.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use weektag_core::{DataSource, SongKey, TagCache, WeeklyDataset};
use weektag_etl::source::HistoryRequest;
use weektag_etl::{Config, FetchError, FetchResult, HistorySource, TagSource, WeeklyPipeline};

struct StaticHistory(Option<Value>);

#[async_trait]
impl HistorySource for StaticHistory {
    async fn recent_tracks(&self, _request: &HistoryRequest) -> FetchResult<Value> {
        self.0.clone().ok_or_else(|| FetchError::Http {
            source_name: "Last.fm".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

#[derive(Default)]
struct CountingTags {
    track: HashMap<String, Vec<String>>,
    artist: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
}

impl CountingTags {
    fn with_track(mut self, track: &str, tags: &[&str]) -> Self {
        self.track
            .insert(track.to_string(), tags.iter().map(|t| (*t).to_string()).collect());
        self
    }

    fn with_artist(mut self, artist: &str, tags: &[&str]) -> Self {
        self.artist
            .insert(artist.to_string(), tags.iter().map(|t| (*t).to_string()).collect());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagSource for CountingTags {
    async fn track_tags(&self, _artist: &str, track: &str) -> FetchResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.track.get(track).cloned().unwrap_or_default())
    }

    async fn artist_tags(&self, artist: &str) -> FetchResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.artist.get(artist).cloned().unwrap_or_default())
    }
}

fn config(dir: &Path) -> Config {
    Config {
        lastfm_api_key: Some("test-key".to_string()),
        lastfm_user: Some("rj".to_string()),
        out_dir: dir.join("out"),
        raw_dir: dir.join("raw"),
        pacing_ms: 0,
        ..Config::default()
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap()
}

fn play(artist: &str, track: &str, uts: i64) -> Value {
    json!({
        "name": track,
        "artist": {"#text": artist, "mbid": ""},
        "date": {"uts": uts.to_string()}
    })
}

/// Three plays of one song and two of another, plus a now-playing entry.
fn week_history() -> Value {
    json!({
        "recenttracks": {
            "track": [
                {"name": "Live", "artist": {"#text": "Now Playing"}, "@attr": {"nowplaying": "true"}},
                play("Radiohead", "Karma Police", 1_709_890_000),
                play("Radiohead", "Karma Police", 1_709_880_000),
                play("radiohead", "karma police", 1_709_870_000),
                play("Burial", "Archangel", 1_709_860_000),
                play("Burial", "Archangel", 1_709_850_000)
            ]
        }
    })
}

fn pipeline(config: Config, history: Option<Value>, tags: &Arc<CountingTags>) -> WeeklyPipeline {
    WeeklyPipeline::new(config).with_sources(
        Arc::new(StaticHistory(history)),
        Arc::clone(tags) as Arc<dyn TagSource>,
    )
}

#[tokio::test]
async fn test_real_week_is_tagged_and_cached() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let tags = Arc::new(
        CountingTags::default()
            .with_track("Karma Police", &["alternative", "rock"])
            .with_artist("Burial", &["dubstep", "electronic"]),
    );

    let report = pipeline(config.clone(), Some(week_history()), &tags)
        .run(now())
        .await
        .unwrap();

    let schedule = report.schedule.unwrap();
    assert_eq!(schedule.distinct_keys, 2);
    assert_eq!(schedule.fetched, 2);
    assert!(report.fallback_reason.is_none());

    let dataset = WeeklyDataset::load(&config.dataset_path()).unwrap();
    assert_eq!(dataset.source, DataSource::LastFm);
    assert_eq!(dataset.user.username, "rj");
    assert_eq!(dataset.range.to_ts, now().timestamp());
    assert_eq!(dataset.scrobbles.len(), 5);
    assert_eq!(dataset.scrobbles[0].tags, vec!["alternative", "rock"]);
    assert_eq!(dataset.scrobbles[2].tags, vec!["alternative", "rock"]);
    assert_eq!(dataset.scrobbles[4].tags, vec!["dubstep", "electronic"]);

    assert_eq!(report.summary.unique_songs, 2);
    assert_eq!(report.summary.scrobbles_with_real_tags, 5);

    let cache = TagCache::load(&config.cache_path());
    assert_eq!(cache.len(), 2);
    assert!(config.raw_history_path().exists());
}

#[tokio::test]
async fn test_second_run_uses_cache_only() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let tags = Arc::new(CountingTags::default().with_track("Karma Police", &["rock"]));

    pipeline(config.clone(), Some(week_history()), &tags)
        .run(now())
        .await
        .unwrap();
    let first_cache = TagCache::load(&config.cache_path());
    let calls_after_first = tags.calls();

    let report = pipeline(config.clone(), Some(week_history()), &tags)
        .run(now())
        .await
        .unwrap();

    assert_eq!(tags.calls(), calls_after_first);
    assert_eq!(report.schedule.unwrap().fetched, 0);
    assert_eq!(TagCache::load(&config.cache_path()), first_cache);
}

#[tokio::test]
async fn test_budget_of_one_tags_other_song_untagged() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        fetch_budget: 1,
        ..config(dir.path())
    };
    let tags = Arc::new(
        CountingTags::default()
            .with_track("Karma Police", &["rock"])
            .with_track("Archangel", &["dubstep"]),
    );

    let report = pipeline(config.clone(), Some(week_history()), &tags)
        .run(now())
        .await
        .unwrap();

    assert_eq!(report.schedule.unwrap().skipped_for_budget, 1);
    let dataset = WeeklyDataset::load(&config.dataset_path()).unwrap();
    assert_eq!(dataset.scrobbles[0].tags, vec!["rock"]);
    assert_eq!(dataset.scrobbles[3].tags, vec!["untagged"]);
    assert!(dataset.scrobbles.iter().all(|s| !s.tags.is_empty()));

    let cache = TagCache::load(&config.cache_path());
    assert_eq!(cache.len(), 1);
    assert!(cache.needs_fetch(&SongKey::new("Burial", "Archangel")));
}

#[tokio::test]
async fn test_unreachable_history_writes_demo() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let tags = Arc::new(CountingTags::default());

    let report = pipeline(config.clone(), None, &tags).run(now()).await.unwrap();

    assert!(report.fallback_reason.is_some());
    assert!(report.schedule.is_none());
    let dataset = WeeklyDataset::load(&config.dataset_path()).unwrap();
    assert_eq!(dataset.source, DataSource::Demo);
    assert_eq!(dataset.scrobbles.len(), 10);
    assert_eq!(tags.calls(), 0);
}

#[tokio::test]
async fn test_missing_credentials_writes_demo() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        lastfm_api_key: None,
        ..config(dir.path())
    };
    let tags = Arc::new(CountingTags::default());

    let report = pipeline(config.clone(), Some(week_history()), &tags)
        .run(now())
        .await
        .unwrap();

    assert_eq!(report.summary.source, DataSource::Demo);
    assert_eq!(report.summary.scrobble_count, 10);
    assert!(!config.cache_path().exists());
    assert!(!config.raw_history_path().exists());
}

#[tokio::test]
async fn test_malformed_and_empty_history_write_demo() {
    for body in [
        json!({"error": 6, "message": "User not found"}),
        json!({"recenttracks": 42}),
        json!({"recenttracks": {"track": []}}),
    ] {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let tags = Arc::new(CountingTags::default());

        let report = pipeline(config.clone(), Some(body), &tags)
            .run(now())
            .await
            .unwrap();

        assert_eq!(report.summary.source, DataSource::Demo);
        assert!(config.dataset_path().exists());
    }
}

#[tokio::test]
async fn test_corrupt_cache_is_treated_as_empty() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    std::fs::create_dir_all(&config.raw_dir).unwrap();
    std::fs::write(config.cache_path(), "{\"truncated\": [").unwrap();
    let tags = Arc::new(CountingTags::default().with_track("Karma Police", &["rock"]));

    let report = pipeline(config.clone(), Some(week_history()), &tags)
        .run(now())
        .await
        .unwrap();

    assert_eq!(report.schedule.unwrap().fetched, 2);
    assert_eq!(TagCache::load(&config.cache_path()).len(), 2);
}

#[tokio::test]
async fn test_uncreatable_output_dir_fails_run() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let config = Config {
        out_dir: blocker.join("out"),
        ..config(dir.path())
    };
    let tags = Arc::new(CountingTags::default());

    let result = pipeline(config, Some(week_history()), &tags).run(now()).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_odd_record_does_not_discard_week() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let tags = Arc::new(CountingTags::default().with_track("Karma Police", &["rock"]));
    let history = json!({
        "recenttracks": {
            "track": [
                play("Radiohead", "Karma Police", 1_709_890_000),
                {"name": "Strange", "artist": {"#text": "Someone"}, "date": "yesterday"},
                {"name": "Down", "artist": 311, "date": {"uts": "1709880000"}},
                play("Burial", "Archangel", 1_709_860_000)
            ]
        }
    });

    let report = pipeline(config.clone(), Some(history), &tags)
        .run(now())
        .await
        .unwrap();

    assert!(report.fallback_reason.is_none());
    let dataset = WeeklyDataset::load(&config.dataset_path()).unwrap();
    assert_eq!(dataset.source, DataSource::LastFm);
    assert_eq!(dataset.scrobbles.len(), 3);
    assert_eq!(dataset.scrobbles[0].tags, vec!["rock"]);
    assert_eq!(dataset.scrobbles[1].artist, "311");
    assert_eq!(dataset.scrobbles[1].tags, vec!["untagged"]);
}

#[tokio::test]
async fn test_huge_window_still_completes() {
    for history in [Some(week_history()), None] {
        let dir = TempDir::new().unwrap();
        let config = Config {
            window_days: u32::MAX,
            ..config(dir.path())
        };
        let tags = Arc::new(CountingTags::default());

        let report = pipeline(config.clone(), history, &tags)
            .run(now())
            .await
            .unwrap();

        let dataset = WeeklyDataset::load(&config.dataset_path()).unwrap();
        assert_eq!(dataset.range.from_ts, 0);
        assert_eq!(dataset.range.to_ts, now().timestamp());
        assert!(report.summary.scrobble_count > 0);
    }
}
