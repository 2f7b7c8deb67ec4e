use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use yts::analyze;
use yts::config::{self, YtsConfig};
use yts::db::{Database, VideoSort};
use yts::extract::youtube::YouTubeClient;
use yts::output::{json as json_out, table};
use yts::pipeline::{self, state, PipelineOptions};

#[derive(Parser)]
#[command(name = "yts", version, about = "YouTube Stats — extract, analyze and store channel video statistics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to database file (default: ~/.yts/yts.db)
    #[arg(long, global = true, env = "YTS_DB")]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a channel's latest statistics, analyze them, and store them
    Run {
        /// Channel ID (default: config default_channel)
        #[arg(long)]
        channel: Option<String>,

        /// Maximum number of uploads to fetch
        #[arg(long)]
        max_results: Option<usize>,

        /// YouTube Data API key (overrides YOUTUBE_API and config)
        #[arg(long)]
        api_key: Option<String>,

        /// Extra attempts per step on transient failures
        #[arg(long)]
        retries: Option<u32>,

        /// Seconds to wait between attempts
        #[arg(long)]
        retry_delay: Option<u64>,
    },

    /// Recommendations from the statistics already stored
    Report,

    /// List stored videos
    List {
        /// Sort by: views (default), published, recorded or title
        #[arg(long, default_value = "views")]
        sort: String,

        /// Maximum results
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Show one stored video
    Show {
        /// Video ID
        id: String,
    },

    /// Show recent pipeline runs
    Runs {
        /// Maximum results
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show database statistics
    Stats,

    /// Manage ~/.yts/config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented template if no config exists
    Init,
    /// Print the config with secrets redacted
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    if let Commands::Config { action } = &cli.command {
        return run_config(action);
    }

    let db_path = match cli.db {
        Some(path) => path,
        None => Database::default_db_path()?,
    };
    let db = Database::open(&db_path)?;

    match cli.command {
        Commands::Run {
            channel,
            max_results,
            api_key,
            retries,
            retry_delay,
        } => {
            let cfg = YtsConfig::load()?;
            let yt = cfg.youtube.clone().unwrap_or_default();
            let key = config::resolve_credential(api_key.as_deref(), config::API_KEY_ENV, Some(&yt))?;
            let client = YouTubeClient::new(key, yt.base_url.clone());

            let opts = PipelineOptions {
                channel_id: cfg.channel_id(channel.as_deref()),
                max_results: cfg.max_results(max_results),
                retries: cfg.retries(retries),
                retry_delay: Duration::from_secs(cfg.retry_delay_secs(retry_delay)),
            };

            let run = pipeline::run_pipeline(&client, &db, &opts)
                .with_context(|| format!("Pipeline run for {} failed", opts.channel_id))?;

            if json_output {
                json_out::print_json(&run)?;
            } else {
                table::print_run(&run);
            }
        }

        Commands::Report => {
            let snapshot = db.load_snapshot()?;
            let report = analyze::analyze(&snapshot)
                .context("Nothing to analyze. Run `yts run` first.")?;
            if json_output {
                json_out::print_json(&report)?;
            } else {
                table::print_report(&report);
            }
        }

        Commands::List { sort, limit } => {
            let sort = VideoSort::from_str(&sort).with_context(|| {
                format!("Unknown sort: {sort}. Use: views, published, recorded, title")
            })?;
            let videos = db.list_videos(sort, limit)?;
            if json_output {
                json_out::print_json(&videos)?;
            } else {
                table::print_video_list(&videos);
            }
        }

        Commands::Show { id } => {
            let video = db
                .get_video(&id)?
                .with_context(|| format!("Video not found: {id}"))?;
            if json_output {
                json_out::print_json(&video)?;
            } else {
                table::print_video_detail(&video);
            }
        }

        Commands::Runs { limit } => {
            let runs = state::recent_runs(&db.conn, limit)?;
            if json_output {
                json_out::print_json(&runs)?;
            } else {
                table::print_runs(&runs);
            }
        }

        Commands::Stats => {
            let stats = db.stats()?;
            let schema_ver = db.meta("schema_version")?.unwrap_or_else(|| "unknown".to_string());
            if json_output {
                json_out::print_json(&serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "schema_version": schema_ver,
                    "db_path": db.path.display().to_string(),
                    "stats": stats,
                }))?;
            } else {
                println!("yts v{} (schema v{})", env!("CARGO_PKG_VERSION"), schema_ver);
                println!("  Database: {}", db.path.display());
                println!("  Size:     {}\n", format_bytes(stats.db_size_bytes));
                table::print_stats(&stats);
            }
        }

        Commands::Config { .. } => unreachable!("handled before opening the database"),
    }

    Ok(())
}

fn run_config(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config::config_path()?;
            if config::init_config()? {
                println!("Created {}", path.display());
            } else {
                println!("Config already exists: {}", path.display());
            }
        }
        ConfigAction::Show => {
            let cfg = YtsConfig::load()?;
            println!("{}", cfg.display_redacted());
        }
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
