//! Fetch and enrichment stages for weektag.
//!
//! Pulls a week of scrobbles from Last.fm, resolves tags for each distinct
//! song (track tags, then artist tags, then the `untagged` fallback) under a
//! per-run fetch budget, and assembles the tagged weekly dataset.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod assemble;
pub mod config;
pub mod error;
pub mod lastfm;
pub mod pipeline;
pub mod resilience;
pub mod resolve;
pub mod schedule;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

pub use assemble::{assemble, demo_dataset, DEMO_SCROBBLE_COUNT};
pub use config::Config;
pub use error::{FetchError, FetchResult};
pub use lastfm::LastFmClient;
pub use pipeline::{RunReport, WeeklyPipeline, FORCED_DEMO_REASON};
pub use resolve::{TagLookup, TagResolver};
pub use schedule::{DedupScheduler, FetchBudget, ScheduleReport};
pub use source::{HistorySource, TagSource};
