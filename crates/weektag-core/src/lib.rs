//! Core domain model for weektag.
//!
//! This crate defines the listening events of a week, the normalized song
//! identity used for deduplication, the persisted tag cache, and the weekly
//! dataset written for downstream reporting.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod cache;
pub mod error;
pub mod model;
pub mod persist;
pub mod provenance;
pub mod tags;

pub use cache::TagCache;
pub use error::{Error, Result};
pub use model::{DatasetSummary, ListeningEvent, SongKey, TimeRange, UserInfo, WeeklyDataset};
pub use provenance::DataSource;
