//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and credentials are available
//! before starting a run that would otherwise degrade to empty results.

use crate::config::Settings;
use crate::error::{ArielError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Analysis needs the reasoning key plus whatever the enabled sources need.
    Analyze,
    /// Serving only needs the reasoning key; sources degrade per request.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    let credentials = settings.credentials();

    if credentials.openai_api_key.is_none() {
        return Err(ArielError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...' \
             (or reasoning.api_key in the config file)"
                .to_string(),
        ));
    }

    if let Operation::Analyze = operation {
        if settings.research.enabled && credentials.research_api_key.is_none() {
            return Err(ArielError::Config(
                "PERPLEXITY_API_KEY not set. Set it, configure research.api_key, \
                 or pass --no-research"
                    .to_string(),
            ));
        }
        if settings.video.enabled {
            check_tool("yt-dlp")?;
        }
    }

    Ok(())
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ArielError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ArielError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ArielError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_keys_pass_without_sources() {
        let mut settings = Settings::default();
        settings.reasoning.api_key = Some("sk-test".to_string());
        settings.research.enabled = false;
        settings.video.enabled = false;

        assert!(check(Operation::Analyze, &settings).is_ok());
        assert!(check(Operation::Serve, &settings).is_ok());
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let err = check_tool("ariel-definitely-not-a-real-tool").unwrap_err();
        assert!(matches!(err, ArielError::ToolNotFound(_)));
    }
}
