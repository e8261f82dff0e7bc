//! Deduplicated, budgeted tag fetching for a week of events.
//!
//! Every distinct [`SongKey`] of the week is looked up in the [`TagCache`];
//! only keys without a resolved entry reach the network, at most
//! [`FetchBudget::ceiling`] of them per run, spaced out by a pacing delay.

use std::collections::HashSet;
use std::time::Duration;

use weektag_core::{ListeningEvent, SongKey, TagCache};

use crate::resilience::RateLimiter;
use crate::resolve::{TagOrigin, TagResolver};

/// Bounds how many songs are resolved over the network in one run.
///
/// Cache hits never consume budget. `used` only grows and never passes
/// `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchBudget {
    ceiling: u32,
    used: u32,
}

impl FetchBudget {
    pub const DEFAULT_CEILING: u32 = 100;

    #[must_use]
    pub const fn new(ceiling: u32) -> Self {
        Self { ceiling, used: 0 }
    }

    /// Claim one network resolution. Returns `false` once exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.used += 1;
        true
    }

    #[must_use]
    pub const fn ceiling(&self) -> u32 {
        self.ceiling
    }

    #[must_use]
    pub const fn used(&self) -> u32 {
        self.used
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.ceiling - self.used
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.used >= self.ceiling
    }
}

impl Default for FetchBudget {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CEILING)
    }
}

/// What a scheduling pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Distinct songs in the week.
    pub distinct_keys: usize,
    /// Songs already resolved in the cache.
    pub cache_hits: usize,
    /// Songs resolved over the network this run.
    pub fetched: usize,
    /// Of `fetched`, songs that ended on the fallback tag.
    pub fetched_untagged: usize,
    /// Songs left unresolved because the budget ran out.
    pub skipped_for_budget: usize,
}

/// Distinct songs of `events` in first-seen order, with the first event
/// of each song as its representative.
pub fn distinct_songs(events: &[ListeningEvent]) -> Vec<(SongKey, &ListeningEvent)> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter_map(|event| {
            let key = event.key();
            seen.insert(key.clone()).then_some((key, event))
        })
        .collect()
}

/// Resolves the tags of every distinct song of a week into the cache.
#[derive(Debug)]
pub struct DedupScheduler<'a> {
    resolver: TagResolver<'a>,
    pacer: RateLimiter,
}

impl<'a> DedupScheduler<'a> {
    /// A scheduler waiting at least `pacing` between network resolutions.
    pub fn new(resolver: TagResolver<'a>, pacing: Duration) -> Self {
        Self {
            resolver,
            pacer: RateLimiter::with_interval(pacing),
        }
    }

    /// Bring `cache` up to date for the songs in `events`.
    ///
    /// Takes the cache by value and hands back the updated one; the caller
    /// is responsible for persisting it.
    pub async fn run(
        &self,
        events: &[ListeningEvent],
        mut cache: TagCache,
        budget: &mut FetchBudget,
    ) -> (TagCache, ScheduleReport) {
        let songs = distinct_songs(events);
        let mut report = ScheduleReport {
            distinct_keys: songs.len(),
            ..ScheduleReport::default()
        };

        for (key, event) in songs {
            if !cache.needs_fetch(&key) {
                report.cache_hits += 1;
                continue;
            }
            if !budget.try_consume() {
                report.skipped_for_budget += 1;
                continue;
            }

            self.pacer.acquire().await;
            let resolution = self.resolver.resolve(&event.artist, &event.track).await;
            log::debug!(
                "Resolved {} via {}: {:?}",
                key,
                resolution.origin,
                resolution.tags
            );
            if resolution.origin == TagOrigin::Fallback {
                report.fetched_untagged += 1;
            }
            cache.insert(key, resolution.tags);
            report.fetched += 1;
        }

        log::info!(
            "Tag scheduling: {} distinct songs, {} cached, {} fetched ({} untagged), {} skipped (budget {}/{})",
            report.distinct_keys,
            report.cache_hits,
            report.fetched,
            report.fetched_untagged,
            report.skipped_for_budget,
            budget.used(),
            budget.ceiling()
        );

        (cache, report)
    }
}
