use anyhow::{Context, Result};
use serde_json::Value;
use toml_edit::{value, DocumentMut};
use weektag_etl::{config, Config};

/// Keys accepted by `config get` / `config set`.
const KEYS: &[&str] = &[
    "lastfm_api_key",
    "lastfm_user",
    "out_dir",
    "raw_dir",
    "fetch_budget",
    "top_n_tags",
    "pacing_ms",
    "request_timeout_secs",
    "window_days",
    "page_limit",
    "history_retries",
];

/// Keys whose values are written as TOML integers.
const NUMERIC_KEYS: &[&str] = &[
    "fetch_budget",
    "top_n_tags",
    "pacing_ms",
    "request_timeout_secs",
    "window_days",
    "page_limit",
    "history_retries",
];

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Unknown config key: {}\n\nValid keys: {}",
        key,
        KEYS.join(", ")
    )
}

/// Render a config value for display, masking the API key.
fn display_value(key: &str, value: &Value) -> String {
    match value {
        Value::Null => "<not set>".to_string(),
        Value::String(s) if key == "lastfm_api_key" => mask(s),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}…")
}

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Current Configuration");
    println!("=====================\n");

    let config_path = config::config_file_path();
    println!("Config file: {}", config_path.display());
    println!(
        "File exists: {}\n",
        if config_path.exists() { "yes" } else { "no (using defaults)" }
    );

    let values = serde_json::to_value(&config)?;
    println!("Settings:");
    for key in KEYS {
        let shown = values
            .get(*key)
            .map(|v| display_value(key, v))
            .unwrap_or_default();
        println!("  {key}: {shown}");
    }

    println!("\nPriority: CLI args > ENV vars (WEEKTAG_*, LASTFM_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value, or print the whole file.
pub fn get_config(key: Option<String>) -> Result<()> {
    let Some(key) = key else {
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'weektag config init' to create it.");
        }
        return Ok(());
    };

    let config = Config::load()?;
    let values = serde_json::to_value(&config)?;
    let value = values.get(key.as_str()).ok_or_else(|| unknown_key(&key))?;
    println!("{}", display_value(&key, value));

    Ok(())
}

/// Set a value in `contents`, keeping comments and layout intact.
fn update_document(contents: &str, key: &str, raw: &str) -> Result<String> {
    if !KEYS.contains(&key) {
        return Err(unknown_key(key));
    }

    let mut document: DocumentMut = contents.parse().context("Failed to parse config file")?;

    if NUMERIC_KEYS.contains(&key) {
        let number: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("{key} expects a whole number, got '{raw}'"))?;
        if number < 0 {
            anyhow::bail!("{key} cannot be negative");
        }
        document[key] = value(number);
    } else {
        document[key] = value(raw);
    }

    Ok(document.to_string())
}

/// Set a config value.
pub fn set_config(key: &str, raw: &str) -> Result<()> {
    let config_path = config::config_file_path();

    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let updated = update_document(&contents, key, raw)?;

    std::fs::write(&config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {} = {}", key, raw);
    println!("  in {}", config_path.display());

    Ok(())
}

/// Show the config file path.
pub fn show_path() {
    println!("{}", config::config_file_path().display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure weektag.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
