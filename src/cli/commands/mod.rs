//! Argument parsing and dispatch to the per-command modules.

mod consume;
mod db;
mod purge;
mod status;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use fruec::config::load_settings;
use fruec::models::EventKind;

use crate::cli::helpers::parse_time_arg;

#[derive(Parser)]
#[command(name = "fruec")]
#[command(about = "Fundraising user event consumer")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Consume new log files of one event kind
    Consume {
        /// Kind of events to consume
        #[arg(value_enum)]
        kind: EventKind,
        /// Start at the latest file already consumed for this kind
        #[arg(long, conflicts_with = "from")]
        from_latest: bool,
        /// Only files from this time onward (RFC 3339 or YYYYMMDDhhmmss)
        #[arg(long, value_parser = parse_time_arg)]
        from: Option<DateTime<Utc>>,
        /// Only files up to this time (RFC 3339 or YYYYMMDDhhmmss)
        #[arg(long, value_parser = parse_time_arg)]
        to: Option<DateTime<Utc>>,
        /// Root directory to search for log files (overrides config)
        #[arg(short, long)]
        directory: Option<PathBuf>,
        /// Filename glob selecting log files (overrides config)
        #[arg(short = 'g', long)]
        file_glob: Option<String>,
    },

    /// Purge data from files left incomplete by an interrupted run
    Purge {
        #[arg(value_enum)]
        kind: EventKind,
        /// Actually delete (otherwise only lists what would be purged)
        #[arg(long)]
        confirm: bool,
    },

    /// Show the latest consumed file time and incomplete files
    Status {
        #[arg(value_enum)]
        kind: EventKind,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or update the database schema
    Migrate,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Consume {
            kind,
            from_latest,
            from,
            to,
            directory,
            file_glob,
        } => {
            let source = settings.log_source_mut(kind);
            if let Some(directory) = directory {
                source.directory = directory;
            }
            if let Some(file_glob) = file_glob {
                source.file_glob = file_glob;
            }
            consume::cmd_consume(&settings, kind, from_latest, from, to).await
        }
        Commands::Purge { kind, confirm } => purge::cmd_purge(&settings, kind, confirm).await,
        Commands::Status { kind, json } => status::cmd_status(&settings, kind, json).await,
        Commands::Migrate => db::cmd_migrate(&settings).await,
    }
}
