//! CLI module for Ariel.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Ariel - Multi-source topic analysis
///
/// Researches a topic across a web research engine and video transcripts,
/// analyzes every excerpt and synthesizes one report.
#[derive(Parser, Debug)]
#[command(name = "ariel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a topic across all enabled sources
    Analyze {
        /// The topic to analyze
        topic: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Overall timeout in seconds (overrides pipeline.timeout_seconds)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Skip the research source
        #[arg(long)]
        no_research: bool,

        /// Skip the video source
        #[arg(long)]
        no_video: bool,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_flags() {
        let cli = Cli::parse_from([
            "ariel", "-vv", "analyze", "quantum computing", "--json", "--timeout", "30", "--no-video",
        ]);

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze {
                topic,
                json,
                timeout,
                no_research,
                no_video,
            } => {
                assert_eq!(topic, "quantum computing");
                assert!(json);
                assert_eq!(timeout, Some(30));
                assert!(!no_research);
                assert!(no_video);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["ariel", "serve"]);
        assert!(matches!(cli.command, Commands::Serve { host: None, port: None }));
    }
}
