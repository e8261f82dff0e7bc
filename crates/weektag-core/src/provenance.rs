use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the scrobbles of a weekly dataset came from.
///
/// Consumers use this marker to tell real listening history apart from the
/// synthetic dataset substituted when the history source is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Real history fetched from Last.fm.
    LastFm,
    /// Synthetic placeholder data.
    Demo,
}

impl DataSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastFm => "lastfm",
            Self::Demo => "demo",
        }
    }

    #[must_use]
    pub const fn is_demo(self) -> bool {
        matches!(self, Self::Demo)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
