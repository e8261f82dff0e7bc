pub mod dataset;
pub mod event;
pub mod key;

pub use dataset::{DatasetSummary, TimeRange, UserInfo, WeeklyDataset};
pub use event::ListeningEvent;
pub use key::SongKey;
