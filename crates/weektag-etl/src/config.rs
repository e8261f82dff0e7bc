use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Longest history window accepted, in days.
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Configuration for weektag.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (WEEKTAG_* prefix, then plain LASTFM_API_KEY /
///    LASTFM_USER for the credentials)
/// 3. Config file (~/.config/weektag/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Last.fm API key. Without it the run produces the demo dataset.
    ///
    /// Can be set via:
    /// - ENV: WEEKTAG_LASTFM_API_KEY or LASTFM_API_KEY
    /// - Config: lastfm_api_key = "..."
    pub lastfm_api_key: Option<String>,

    /// Last.fm username whose history is fetched.
    ///
    /// Can be set via:
    /// - CLI: --user name
    /// - ENV: WEEKTAG_LASTFM_USER or LASTFM_USER
    /// - Config: lastfm_user = "..."
    pub lastfm_user: Option<String>,

    /// Directory receiving `week_data.json`.
    pub out_dir: PathBuf,

    /// Directory receiving the tag cache and the raw history dump.
    pub raw_dir: PathBuf,

    /// Maximum number of songs resolved over the network per run.
    #[serde(deserialize_with = "lenient_number")]
    pub fetch_budget: u32,

    /// Tags kept per source (track or artist).
    #[serde(deserialize_with = "lenient_number")]
    pub top_n_tags: usize,

    /// Delay between consecutive network resolutions, in milliseconds.
    #[serde(deserialize_with = "lenient_number")]
    pub pacing_ms: u64,

    /// Timeout applied to every HTTP request, in seconds.
    #[serde(deserialize_with = "lenient_number")]
    pub request_timeout_secs: u64,

    /// Length of the history window, in days.
    #[serde(deserialize_with = "lenient_number")]
    pub window_days: u32,

    /// Scrobbles requested in the single history fetch (Last.fm caps at 200).
    #[serde(deserialize_with = "lenient_number")]
    pub page_limit: u32,

    /// Retries of a transient history-fetch failure before falling back.
    #[serde(deserialize_with = "lenient_number")]
    pub history_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lastfm_api_key: None,
            lastfm_user: None,
            out_dir: PathBuf::from("out"),
            raw_dir: PathBuf::from("raw"),
            fetch_budget: 100,
            top_n_tags: 5,
            pacing_ms: 200,
            request_timeout_secs: 20,
            window_days: 7,
            page_limit: 200,
            history_retries: 2,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/weektag/config.toml
    /// Reads environment variables with WEEKTAG_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("weektag");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let mut config: Self = builder.build().context("Failed to build configuration")?;
        config.apply_env_fallbacks(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Reject values no run can work with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.window_days == 0 || self.window_days > MAX_WINDOW_DAYS {
            anyhow::bail!(
                "window_days must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS,
                self.window_days
            );
        }
        if self.top_n_tags == 0 {
            anyhow::bail!("top_n_tags must be at least 1");
        }
        Ok(())
    }

    /// Fill missing credentials from the plain `LASTFM_*` variables.
    ///
    /// `lookup` resolves a variable name; blank values count as unset.
    pub fn apply_env_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if non_blank(self.lastfm_api_key.as_deref()).is_none() {
            self.lastfm_api_key = read("LASTFM_API_KEY");
        }
        if non_blank(self.lastfm_user.as_deref()).is_none() {
            self.lastfm_user = read("LASTFM_USER");
        }
    }

    /// The (api key, username) pair, when both are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        non_blank(self.lastfm_api_key.as_deref()).zip(non_blank(self.lastfm_user.as_deref()))
    }

    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn dataset_path(&self) -> PathBuf {
        self.out_dir.join("week_data.json")
    }

    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.raw_dir.join("tags_cache.json")
    }

    #[must_use]
    pub fn raw_history_path(&self) -> PathBuf {
        self.raw_dir.join("lastfm_recenttracks.json")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accept numbers written either natively or as strings (environment
/// variables always arrive as strings).
fn lenient_number<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/weektag/config.toml
/// - macOS: ~/Library/Application Support/weektag/config.toml
/// - Windows: %APPDATA%\weektag\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weektag")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Weektag Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (WEEKTAG_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Last.fm API key and username
# Without both, `weektag fetch` writes a demo dataset instead.
#
# Get an API key at: https://www.last.fm/api/account/create
#
# Can also be set via:
# - Environment: WEEKTAG_LASTFM_API_KEY / LASTFM_API_KEY
# - Environment: WEEKTAG_LASTFM_USER / LASTFM_USER
#lastfm_api_key = "your-lastfm-api-key-here"
#lastfm_user = "your-lastfm-username"

# Output locations
#out_dir = "out"
#raw_dir = "raw"

# At most this many songs get their tags fetched per run; the rest
# are picked up by later runs through the tag cache.
#fetch_budget = 100

# Tags kept per source (track tags, then artist tags)
#top_n_tags = 5

# Delay between tag lookups (ms) and per-request timeout (s)
#pacing_ms = 200
#request_timeout_secs = 20

# History window and size of the single fetch
#window_days = 7
#page_limit = 200

# Retries of a transient history-fetch failure
#history_retries = 2
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
