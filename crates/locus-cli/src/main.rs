//! Locus operator CLI
//!
//! Seeds bootstrap credentials into the encrypted store and reports the
//! state a device would resume from. Provisioning itself needs a cloud
//! adapter and runs inside the embedding application.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{common, import, status};

#[derive(Parser)]
#[command(name = "locus")]
#[command(about = "Locus - private cloud provisioning for tracking devices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "locus.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Show authentication, onboarding and provisioning job status
    Status,

    /// Store bootstrap credentials pasted from `aws sts get-session-token`
    ImportCredentials {
        /// JSON file to read; stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Region to use when the JSON does not name one
        #[arg(short, long)]
        region: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = common::load_config(&cli.config)?;

    match cli.command {
        Commands::Status => {
            status::show_status(&config).await?;
        }

        Commands::ImportCredentials { file, region } => {
            import::run(&config, file.as_deref(), region.as_deref()).await?;
        }

        Commands::Config => {
            commands::config::show_config(&config)?;
        }
    }

    Ok(())
}
