//! Cadence - project history tool.
//!
//! Reads and maintains the version-control history saved next to a project.

mod commands;
mod offline;

use std::path::PathBuf;

use cadence_storage::JsonDocumentStore;
use cadence_util::{LogConfig, LogLevel};
use cadence_vcs::VcsConfig;
use clap::{Parser, Subcommand};
use commands::{HistoryCommands, StashCommands, SyncCommands};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about = "Inspect and maintain project histories", long_about = None)]
struct Cli {
    /// Project directory holding the `.cadence` store
    #[arg(short = 'C', long, default_value = ".")]
    dir: PathBuf,

    /// Store directory, overriding `<dir>/.cadence`
    #[arg(long)]
    store: Option<PathBuf>,

    /// Project id within the store
    #[arg(short, long, default_value = "default")]
    project: String,

    /// Version control config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print output as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a history for the project if it has none
    Init,
    #[command(flatten)]
    History(HistoryCommands),
    /// Manage stashes
    Stash {
        #[command(subcommand)]
        command: StashCommands,
    },
    /// Remote sync state
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = VcsConfig::load(cli.config.as_deref()).await?;
    init_logging(cli.verbose, &config);

    let store = match &cli.store {
        Some(path) => JsonDocumentStore::new(path.clone()),
        None => JsonDocumentStore::for_project_dir(&cli.dir),
    };
    tracing::debug!(store = %store.base_path().display(), project = %cli.project, "opening history");

    let ctx = commands::Context {
        store,
        project_id: cli.project,
        config,
        json: cli.json,
    };

    match cli.command {
        Commands::Init => commands::handle_init(&ctx).await,
        Commands::History(command) => commands::handle_history(command, &ctx).await,
        Commands::Stash { command } => commands::handle_stash(command, &ctx).await,
        Commands::Sync { command } => commands::handle_sync(command, &ctx).await,
        Commands::Version => {
            println!("cadence {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, config: &VcsConfig) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        config.log_level.unwrap_or(LogLevel::Warn)
    };
    let log = LogConfig {
        print: verbose,
        level,
        include_location: verbose,
        file: (!verbose).then(cadence_util::log::default_log_path).flatten(),
    };
    if let Err(e) = cadence_util::log::init(log) {
        eprintln!("Warning: Could not initialize logging: {e}");
    }
}
