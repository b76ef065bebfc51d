mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use user_events::{export::Dimension, Config};

/// Maintenance tools for the user_events table
#[derive(Parser)]
#[command(name = "user-events", version, about)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// TLS mode: disable, prefer or require
    #[arg(long, env = "DATABASE_SSLMODE", global = true)]
    sslmode: Option<String>,

    /// Print machine-readable JSON instead of the console report
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create any missing performance indexes on user_events
    Indexes,
    /// Export distinct user_agent/ip_address pairs to CSV
    Export(cli::ExportArgs),
    /// List distinct event types
    EventTypes {
        /// Maximum number of values to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List distinct advertisers
    Advertisers {
        /// Maximum number of values to show
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Cli::parse();
    let config = Config::resolve(args.database_url, args.sslmode)?;

    match args.command {
        Command::Indexes => cli::run_indexes(&config, args.json).await,
        Command::Export(export) => cli::run_export(&config, &export, args.json).await,
        Command::EventTypes { limit } => {
            cli::run_listing(&config, Dimension::EventType, limit, args.json).await
        }
        Command::Advertisers { limit } => {
            cli::run_listing(&config, Dimension::Advertiser, limit, args.json).await
        }
    }
}
