//! CLI output formatting utilities.

use crate::report::{Report, SourceReport, SourceStatus};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one source section of a report.
    pub fn source_section(source: &SourceReport) {
        match &source.status {
            SourceStatus::Genuine => {
                Output::header(&format!("Source: {}", source.source));
                Output::kv(
                    "Segments",
                    &format!(
                        "{} analyzed, {} degraded",
                        source.segments_analyzed, source.segments_degraded
                    ),
                );
            }
            SourceStatus::Fallback { reason } => {
                Output::header(&format!("Source: {} (no data)", source.source));
                Output::kv("Reason", reason);
                return;
            }
        }

        let result = &source.result;
        if !result.summary.is_empty() {
            println!("  {}", content_preview(&result.summary, 600));
        }
        for point in &result.key_points {
            Output::list_item(point);
        }
        if !result.topics.is_empty() {
            let topics: Vec<_> = result.topics.iter().map(String::as_str).collect();
            Output::kv("Topics", &topics.join(", "));
        }
        Output::kv(
            "Sentiment",
            &format!(
                "{:.0}% positive, {:.0}% negative, {:.0}% neutral",
                result.sentiment.positive * 100.0,
                result.sentiment.negative * 100.0,
                result.sentiment.neutral * 100.0
            ),
        );
        Output::kv("Complexity", &format!("{:.2}", result.technical_complexity));
        Output::kv("Relevance", &format!("{:.2}", result.relevance));
    }

    /// Print a full report.
    pub fn report(report: &Report) {
        Output::header(&format!("Report: {}", report.topic));
        Output::kv("Id", &report.id);

        for source in &report.sources {
            Output::source_section(source);
        }

        if !report.narrative.is_empty() {
            Output::header("Synthesis");
            for (theme, text) in &report.narrative {
                println!("  {} {}", style(format!("{}:", theme)).bold(), text);
            }
        }

        for (title, items) in [
            ("Consensus", &report.consensus),
            ("Debate", &report.debate),
            ("Follow-up questions", &report.follow_up_questions),
        ] {
            if items.is_empty() {
                continue;
            }
            Output::header(title);
            for item in items {
                Output::list_item(item);
            }
        }

        println!();
        for diagnostic in &report.diagnostics {
            let msg = match diagnostic.source {
                Some(source) => format!("[{}] {}", source, diagnostic.message),
                None => diagnostic.message.clone(),
            };
            Output::warning(&msg);
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short\ntext", 20), "short text");
        assert_eq!(content_preview("abcdef", 3), "abc...");
        // Multi-byte characters are never split
        assert_eq!(content_preview("ééééé", 2), "éé...");
    }
}
