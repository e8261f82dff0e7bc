use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "weektag", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Fetch the last week of scrobbles and tag them
    ///
    /// Pulls recent tracks for the configured Last.fm user and resolves tags
    /// for every distinct song of the week:
    ///
    /// - Track tags first, artist tags when the track has none
    /// - `untagged` when neither source has tags (a local placeholder, not
    ///   a Last.fm tag)
    /// - Songs already tagged in the cache are never fetched again
    /// - At most `fetch_budget` songs are fetched per run; the rest are
    ///   picked up by later runs
    ///
    /// Without credentials, or when Last.fm cannot be reached, a demo dataset
    /// is written instead and marked with `"source": "demo"`.
    ///
    /// Output:
    /// - <out_dir>/week_data.json   tagged weekly dataset
    /// - <raw_dir>/tags_cache.json  tag cache reused by the next run
    /// - <raw_dir>/lastfm_recenttracks.json  raw history response
    Fetch {
        /// Last.fm username (overrides config)
        #[arg(long)]
        user: Option<String>,

        /// Maximum number of songs to fetch tags for
        #[arg(long)]
        budget: Option<u32>,

        /// Output directory for week_data.json
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Directory for the tag cache and raw responses
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Write the demo dataset without contacting Last.fm
        #[arg(long)]
        demo: bool,
    },
    /// Summarize the last written dataset
    Status {
        /// Output directory holding week_data.json
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file
    Get { key: Option<String> },
    /// Set a value in the config file
    Set { key: String, value: String },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.parse_default_env();
    clog.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // A local .env may carry LASTFM_API_KEY / LASTFM_USER.
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Fetch {
            user,
            budget,
            out_dir,
            raw_dir,
            demo,
        } => {
            let overrides = commands::FetchOverrides {
                user,
                budget,
                out_dir,
                raw_dir,
            };
            commands::run_fetch(overrides, demo).await?;
        }
        Commands::Status { out_dir } => {
            commands::show_status(out_dir)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config()?,
            ConfigAction::Get { key } => commands::config::get_config(key)?,
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value)?,
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}
