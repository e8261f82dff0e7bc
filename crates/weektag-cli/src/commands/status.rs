use anyhow::{Context, Result};
use chrono::DateTime;
use std::path::PathBuf;
use weektag_core::{DatasetSummary, WeeklyDataset};
use weektag_etl::Config;

pub fn show_status(out_dir: Option<PathBuf>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(out_dir) = out_dir {
        config.out_dir = out_dir;
    }

    let path = config.dataset_path();
    if !path.exists() {
        println!("No dataset at {}. Run `weektag fetch` first.", path.display());
        return Ok(());
    }

    let dataset = WeeklyDataset::load(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    println!("\n📊 Weektag Status\n");
    println!("  Dataset: {}", path.display());
    println!("  User: {}", dataset.user.username);
    println!(
        "  Range: {} → {}",
        format_ts(dataset.range.from_ts),
        format_ts(dataset.range.to_ts)
    );
    println!("  Source: {}", dataset.source);
    print_summary(&dataset.summary());

    if dataset.source.is_demo() {
        println!("\n  This is demo data. Set LASTFM_API_KEY and LASTFM_USER, then run `weektag fetch`.");
    }

    Ok(())
}

/// Print the counters shared by `fetch` and `status`.
fn print_summary(summary: &DatasetSummary) {
    println!("{}", summary_lines(summary).join("\n"));
}

pub fn summary_lines(summary: &DatasetSummary) -> Vec<String> {
    vec![
        format!(
            "  Scrobbles: {} ({} unique songs)",
            summary.scrobble_count, summary.unique_songs
        ),
        format!(
            "  With any tags: {}, with real tags: {} ({:.1}% coverage)",
            summary.scrobbles_with_any_tags,
            summary.scrobbles_with_real_tags,
            summary.real_tag_coverage() * 100.0
        ),
        "  Note: 'untagged' is a local placeholder, not a Last.fm tag.".to_string(),
    ]
}

fn format_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ts() {
        assert_eq!(format_ts(0), "1970-01-01 00:00 UTC");
        assert_eq!(format_ts(1_709_899_200), "2024-03-08 12:00 UTC");
    }
}
