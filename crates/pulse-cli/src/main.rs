//! pulse — the PulseGrid command line.
//!
//! # Usage
//!
//! ```text
//! pulse init --config pulse.toml
//! pulse validate --config pulse.toml
//! pulse run --config pulse.toml --data-dir data
//! pulse report --data-dir data
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "pulse",
    about = "PulseGrid — periodic HTTP availability prober",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every configured endpoint once and record the results.
    ///
    /// Writes pulse_result.json (this run), pulse_log.json (history) and
    /// index.html (status page) into the data directory.
    Run {
        /// Configuration file.
        #[arg(short, long, default_value = "pulse.toml")]
        config: PathBuf,
        /// Directory for result, history and report files.
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
        /// Maximum probes in flight (overrides the config file).
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Re-render the status page from the recorded history.
    Report {
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Check a configuration file and print what would be probed.
    Validate {
        #[arg(short, long, default_value = "pulse.toml")]
        config: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a starter configuration file.
    Init {
        #[arg(short, long, default_value = "pulse.toml")]
        config: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pulse=info,pulsegrid=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data_dir,
            concurrency,
        } => commands::run::run(&config, &data_dir, concurrency).await,
        Commands::Report { data_dir } => commands::report::report(&data_dir),
        Commands::Validate { config, format } => commands::validate::validate(&config, &format),
        Commands::Init { config, force } => commands::validate::init(&config, force),
    }
}
