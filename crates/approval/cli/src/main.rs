//! approvalctl - command-line companion for approval workflows
//!
//! - `eval` checks a conditional rule against a subject document
//! - `simulate` replays a scenario file against the in-memory engine

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod input;
mod scenario;

use approval_engine::EngineConfig;

/// approvalctl CLI
#[derive(Parser)]
#[command(name = "approvalctl")]
#[command(about = "Evaluate approval rules and replay approval scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file path
    #[arg(short, long, env = "APPROVAL_CONFIG")]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "APPROVAL_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "APPROVAL_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a conditional rule against a subject
    Eval {
        /// Rule tree, inline JSON or a file path
        #[arg(short, long)]
        rule: String,

        /// Subject attributes, inline JSON or a file path
        #[arg(short, long)]
        subject: String,
    },

    /// Replay a scenario file and print the resulting instance
    Simulate {
        /// Scenario file path
        scenario: String,

        /// Stop at the first refused event instead of recording it
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Eval { rule, subject } => commands::eval::run(&rule, &subject),
        Commands::Simulate { scenario, strict } => {
            let config = EngineConfig::load(cli.config.as_deref())?;
            commands::simulate::run(&scenario, config, strict).await
        }
    }
}
