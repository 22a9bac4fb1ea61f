//! cms-sync command line
//!
//! Usage:
//!     cms-sync run                      # sync datasets changed since the last good run
//!     cms-sync status                   # watermark and run history
//!     cms-sync datasets --after 2024-01-01

use clap::{Parser, Subcommand};
use cms_sync_logging::{init_logging, ConsoleLevel, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(
    name = "cms-sync",
    about = "Incrementally sync CMS provider datasets into local CSV files"
)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Only log warnings and errors on stderr
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file (default: ~/.cms_sync/config.toml when present)
    #[arg(long, global = true, env = "CMS_SYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: cli::ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download every dataset modified since the last successful run
    Run,

    /// Show the current watermark and the run history
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List eligible datasets without downloading them
    Datasets {
        /// Watermark to filter against (default: last successful run)
        #[arg(long)]
        after: Option<chrono::NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let console = if cli.verbose {
        ConsoleLevel::Verbose
    } else if cli.quiet {
        ConsoleLevel::Quiet
    } else {
        ConsoleLevel::Normal
    };
    if let Err(err) = init_logging(LogConfig::new("cms-sync").with_console(console)) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }

    match run_command(cli).await {
        Ok(cli::CommandStatus::Success) => ExitCode::SUCCESS,
        Ok(cli::CommandStatus::RunFailed) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::from(1)
        }
    }
}

async fn run_command(cli: Cli) -> anyhow::Result<cli::CommandStatus> {
    let config = cli::resolve_config(cli.config.as_deref(), &cli.overrides)?;
    match cli.command {
        Commands::Run => cli::run::run(&config).await,
        Commands::Status { json } => cli::status::run(&config, json),
        Commands::Datasets { after, json } => cli::datasets::run(&config, after, json).await,
    }
}
