//! Analyze command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Overrides passed on the command line.
#[derive(Debug, Default)]
pub struct AnalyzeOptions {
    pub json: bool,
    pub timeout: Option<u64>,
    pub no_research: bool,
    pub no_video: bool,
}

/// Run the analyze command.
pub async fn run_analyze(topic: &str, options: AnalyzeOptions, mut settings: Settings) -> Result<()> {
    if options.no_research {
        settings.research.enabled = false;
    }
    if options.no_video {
        settings.video.enabled = false;
    }
    if let Some(timeout) = options.timeout {
        settings.pipeline.timeout_seconds = timeout;
    }
    settings.validate()?;

    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Analyze, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'ariel doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(&settings)?;

    let spinner = if options.json {
        None
    } else {
        Some(Output::spinner(&format!("Analyzing '{}'...", topic.trim())))
    };

    let result = orchestrator.run(topic).await;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Analysis failed: {}", e));
            return Err(e.into());
        }
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    Output::report(&report);

    if report.has_partial_data() {
        Output::warning("Report is based on partial data; see the notes above.");
    } else {
        Output::success("Analysis complete.");
    }

    Ok(())
}
