//! Configuration module for Ariel.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts, ResearchPrompts, SynthesisPrompts};
pub use settings::{
    ChunkingMode, Credentials, GeneralSettings, PipelineSettings, PromptSettings,
    ReasoningSettings, RelevanceMode, ResearchSettings, ServerSettings, Settings,
    VideoSettings, MAX_TIMEOUT_SECONDS,
};
