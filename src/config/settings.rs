//! Configuration settings for Ariel.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound for any pipeline timeout, in seconds.
pub const MAX_TIMEOUT_SECONDS: u64 = 3600;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub reasoning: ReasoningSettings,
    pub research: ResearchSettings,
    pub video: VideoSettings,
    pub pipeline: PipelineSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for temporary files (subtitle downloads).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/ariel".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Reasoning provider (LLM) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    /// Chat model used for segment analysis and synthesis.
    pub model: String,
    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    /// Custom API base URL (OpenAI-compatible endpoints).
    pub api_base: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_base: None,
            temperature: 0.3,
            request_timeout_seconds: 120,
        }
    }
}

/// Research source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSettings {
    /// Include the research source in analyses.
    pub enabled: bool,
    /// Chat completions endpoint of the research API.
    pub endpoint: String,
    /// Research model.
    pub model: String,
    /// API key. Falls back to `PERPLEXITY_API_KEY` when unset.
    pub api_key: Option<String>,
    /// Maximum tokens in the research answer.
    pub max_tokens: u32,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.perplexity.ai/chat/completions".to_string(),
            model: "sonar".to_string(),
            api_key: None,
            max_tokens: 1000,
        }
    }
}

/// Video source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Include the video source in analyses.
    pub enabled: bool,
    /// Maximum number of videos fetched per topic.
    pub max_videos: usize,
    /// Subtitle language used as transcript.
    pub subtitle_language: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_videos: 5,
            subtitle_language: "en".to_string(),
        }
    }
}

/// Segmentation strategy for long source text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingMode {
    /// Fixed word count per segment.
    #[default]
    Words,
    /// Whole sentences packed up to the word limit.
    Sentences,
}

impl std::str::FromStr for ChunkingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "words" | "word" => Ok(ChunkingMode::Words),
            "sentences" | "sentence" => Ok(ChunkingMode::Sentences),
            _ => Err(format!("Unknown chunking mode: {}", s)),
        }
    }
}

/// How the per-source relevance score is computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceMode {
    /// Fixed constant for any source with content.
    #[default]
    Placeholder,
    /// Share of topic terms found in the aggregated topics and summary.
    TermOverlap,
}

impl std::fmt::Display for RelevanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelevanceMode::Placeholder => write!(f, "placeholder"),
            RelevanceMode::TermOverlap => write!(f, "term_overlap"),
        }
    }
}

/// Pipeline orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Deadline for fetching and segment analysis in one run.
    pub timeout_seconds: u64,
    /// Budget for the synthesis call, counted from the end of aggregation.
    pub synthesis_timeout_seconds: u64,
    /// Maximum concurrent segment analysis calls per source.
    pub max_concurrent_segments: usize,
    /// Maximum words per segment.
    pub segment_max_words: usize,
    /// Segmentation strategy.
    pub chunking: ChunkingMode,
    /// Relevance scoring policy.
    pub relevance: RelevanceMode,
    /// Constant returned by the placeholder relevance policy.
    pub placeholder_relevance: f64,
    /// Maximum follow-up questions kept in the report.
    pub max_follow_up_questions: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 180,
            synthesis_timeout_seconds: 60,
            max_concurrent_segments: 4,
            segment_max_words: 200,
            chunking: ChunkingMode::Words,
            relevance: RelevanceMode::Placeholder,
            placeholder_relevance: 0.8,
            max_follow_up_questions: 5,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5003,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "https://localhost:3000".to_string(),
            ],
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// Credentials resolved once at startup and injected into providers.
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub research_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("research_api_key", &self.research_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ArielError;

        for (name, value) in [
            ("pipeline.timeout_seconds", self.pipeline.timeout_seconds),
            (
                "pipeline.synthesis_timeout_seconds",
                self.pipeline.synthesis_timeout_seconds,
            ),
        ] {
            if !(1..=MAX_TIMEOUT_SECONDS).contains(&value) {
                return Err(ArielError::Config(format!(
                    "{} must be between 1 and {}",
                    name, MAX_TIMEOUT_SECONDS
                )));
            }
        }
        if self.pipeline.segment_max_words == 0 {
            return Err(ArielError::Config(
                "pipeline.segment_max_words must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pipeline.placeholder_relevance) {
            return Err(ArielError::Config(
                "pipeline.placeholder_relevance must be within [0, 1]".to_string(),
            ));
        }
        url::Url::parse(&self.research.endpoint).map_err(|e| {
            ArielError::Config(format!("research.endpoint is not a valid URL: {}", e))
        })?;
        if let Some(base) = &self.reasoning.api_base {
            url::Url::parse(base).map_err(|e| {
                ArielError::Config(format!("reasoning.api_base is not a valid URL: {}", e))
            })?;
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ArielError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ariel")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Resolve credentials from the config file, falling back to the environment.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            openai_api_key: non_empty(self.reasoning.api_key.clone())
                .or_else(|| non_empty(std::env::var("OPENAI_API_KEY").ok())),
            research_api_key: non_empty(self.research.api_key.clone())
                .or_else(|| non_empty(std::env::var("PERPLEXITY_API_KEY").ok())),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
