mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod logging;
mod services;
#[cfg(test)]
mod testing;
mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::error::AppResult;

#[derive(Parser)]
#[command(
    name = "hark",
    author,
    version,
    about = "Files Jira tickets for actionable Slack messages"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short, global = true, env = "HARK_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen to the monitored channels and file tickets (default).
    Run,
    /// Inspect or validate the configuration.
    Config(ConfigArgs),
    /// Classify a message without filing anything.
    Classify {
        /// Message text to classify.
        text: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!(%error, "hark stopped");
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config(args) => config_cmd::run(args.command, &cli.config),
        Commands::Classify { text } => {
            let config = AppConfig::load(&cli.config)?;
            logging::init(&config.logging)?;
            cmd::classify::run(&config, &text).await
        }
        Commands::Run => {
            let config = AppConfig::load(&cli.config)?;
            logging::init(&config.logging)?;
            cmd::run::run(config).await
        }
    }
}
