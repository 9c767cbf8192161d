//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Ariel Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();
    let credentials = settings.credentials();

    println!("{}", style("Reasoning").bold());
    let check = check_key(
        "OPENAI_API_KEY",
        credentials.openai_api_key.as_deref(),
        true,
        "Set with: export OPENAI_API_KEY='sk-...' (or reasoning.api_key)",
    );
    check.print();
    checks.push(check);
    println!();

    println!("{}", style("Research source").bold());
    let check = if settings.research.enabled {
        check_key(
            "PERPLEXITY_API_KEY",
            credentials.research_api_key.as_deref(),
            false,
            "Set with: export PERPLEXITY_API_KEY='pplx-...' (or research.api_key)",
        )
    } else {
        CheckResult::ok("Research", "disabled")
    };
    check.print();
    checks.push(check);
    println!();

    println!("{}", style("Video source").bold());
    let check = if settings.video.enabled {
        check_tool("yt-dlp", install_hint_ytdlp())
    } else {
        CheckResult::ok("Video", "disabled")
    };
    check.print();
    checks.push(check);

    let check = check_temp_dir(settings);
    check.print();
    checks.push(check);
    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);
    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Ariel.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Ariel is ready to use.");
    }

    Ok(())
}

/// Check a credential, masking it for display.
///
/// A missing required key is an error; a missing optional one a warning,
/// since that source then degrades to an empty result.
fn check_key(name: &str, key: Option<&str>, required: bool, hint: &str) -> CheckResult {
    match key {
        Some(key) if key.chars().count() > 12 => {
            let head: String = key.chars().take(5).collect();
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            CheckResult::ok(name, &format!("configured ({}...{})", head, tail))
        }
        Some(_) => CheckResult::warning(name, "set but looks too short", hint),
        None if required => CheckResult::error(name, "not set", hint),
        None => CheckResult::warning(name, "not set (source will return no data)", hint),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check the subtitle download directory.
fn check_temp_dir(settings: &Settings) -> CheckResult {
    let temp_dir = settings.temp_dir();
    if temp_dir.exists() {
        CheckResult::ok("Temp directory", &format!("{}", temp_dir.display()))
    } else {
        CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first use",
        )
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: ariel config edit")
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp (or pass --no-video)"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or pass --no-video)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp (or pass --no-video)"
    }
}
