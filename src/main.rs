//! Ariel CLI entry point.

use anyhow::Result;
use ariel::cli::{commands, Cli, Commands};
use ariel::config::Settings;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("ariel={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Execute command
    match cli.command {
        Commands::Analyze {
            topic,
            json,
            timeout,
            no_research,
            no_video,
        } => {
            let options = commands::AnalyzeOptions {
                json,
                timeout,
                no_research,
                no_video,
            };
            commands::run_analyze(&topic, options, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, config_path, settings)?;
        }
    }

    Ok(())
}
