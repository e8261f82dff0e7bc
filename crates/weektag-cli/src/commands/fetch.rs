use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use weektag_etl::{Config, RunReport, WeeklyPipeline};

use super::status::summary_lines;

/// Command-line values that take precedence over the loaded config.
#[derive(Debug, Default)]
pub struct FetchOverrides {
    pub user: Option<String>,
    pub budget: Option<u32>,
    pub out_dir: Option<PathBuf>,
    pub raw_dir: Option<PathBuf>,
}

impl FetchOverrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(user) = self.user {
            config.lastfm_user = Some(user);
        }
        if let Some(budget) = self.budget {
            config.fetch_budget = budget;
        }
        if let Some(out_dir) = self.out_dir {
            config.out_dir = out_dir;
        }
        if let Some(raw_dir) = self.raw_dir {
            config.raw_dir = raw_dir;
        }
    }
}

pub async fn run_fetch(overrides: FetchOverrides, demo: bool) -> Result<()> {
    let mut config = Config::load()?;
    overrides.apply(&mut config);

    let pipeline = WeeklyPipeline::new(config).force_demo(demo);
    let report = pipeline.run(Utc::now()).await?;

    print_report(&report, pipeline.config());
    Ok(())
}

fn print_report(report: &RunReport, config: &Config) {
    println!("\n{}", render_report(report, config).join("\n"));
}

/// Lines printed after a run: the written file, why demo data was used or
/// what happened to the tag cache, then the dataset summary.
fn render_report(report: &RunReport, config: &Config) -> Vec<String> {
    let mut lines = vec![format!(
        "✓ Wrote {} (source={}, scrobble_count={})",
        report.dataset_path.display(),
        report.summary.source,
        report.summary.scrobble_count
    )];

    if let Some(reason) = &report.fallback_reason {
        lines.push(format!("  Demo data used: {reason}"));
    }

    if let Some(schedule) = &report.schedule {
        lines.push(format!(
            "  Tag cache: {} (fetched {} new, {} cached, {} left for later runs; budget {})",
            config.cache_path().display(),
            schedule.fetched,
            schedule.cache_hits,
            schedule.skipped_for_budget,
            config.fetch_budget
        ));
    }

    lines.extend(summary_lines(&report.summary));
    lines
}
