//! Weekly dataset assembly.

use chrono::{DateTime, Utc};

use weektag_core::{DataSource, ListeningEvent, TagCache, TimeRange, UserInfo, WeeklyDataset};

/// Number of scrobbles in the demo dataset.
pub const DEMO_SCROBBLE_COUNT: usize = 10;

/// Username used for the demo dataset when none is configured.
pub const DEMO_USERNAME: &str = "demo_user";

const DEMO_ARTIST: &str = "Radiohead";
const DEMO_TAGS: [&str; 2] = ["demo", "alternative"];

/// Attach tags from `cache` to every event and wrap them into a dataset.
///
/// Songs without a resolved cache entry (skipped for budget, or never
/// fetched) get the fallback tag set, so no event leaves with empty tags.
pub fn assemble(
    user: UserInfo,
    range: TimeRange,
    events: Vec<ListeningEvent>,
    cache: &TagCache,
) -> WeeklyDataset {
    let scrobbles = events
        .into_iter()
        .map(|event| {
            let tags = cache.tags_or_fallback(&event.key());
            event.with_tags(tags)
        })
        .collect();

    WeeklyDataset {
        source: DataSource::LastFm,
        generated_at: range.to_ts,
        user,
        range,
        scrobbles,
    }
}

/// Deterministic stand-in dataset used when real history is unavailable.
///
/// Holds [`DEMO_SCROBBLE_COUNT`] hourly plays of placeholder tracks ending
/// at `now`, and is marked with [`DataSource::Demo`].
pub fn demo_dataset(username: Option<&str>, now: DateTime<Utc>, window_days: u32) -> WeeklyDataset {
    let to_ts = now.timestamp();
    let scrobbles = (0..DEMO_SCROBBLE_COUNT)
        .map(|i| ListeningEvent {
            timestamp: to_ts - i64::try_from(i).unwrap_or_default() * 3600,
            artist: DEMO_ARTIST.to_string(),
            track: format!("Demo Track {}", i + 1),
            tags: DEMO_TAGS.iter().map(|t| (*t).to_string()).collect(),
        })
        .collect();

    let username = username
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEMO_USERNAME);

    WeeklyDataset {
        source: DataSource::Demo,
        generated_at: to_ts,
        user: UserInfo {
            username: username.to_string(),
        },
        range: TimeRange::last_days(now, window_days),
        scrobbles,
    }
}
