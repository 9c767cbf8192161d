//! Prompt templates for Ariel.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub analysis: AnalysisPrompts,
    pub synthesis: SynthesisPrompts,
    pub research: ResearchPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for per-segment analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert content analyzer. You receive one excerpt of a video transcript or research document and judge it on its own.

Provide a structured analysis in JSON format with the following fields:
- "summary": one or two sentences summarizing the excerpt
- "key_points": list of the key points discussed
- "topics": list of short topic labels covered
- "sentiment": object with "positive", "negative" and "neutral" scores
- "technical_complexity": score from 0 to 10
- "speaker_info": object mapping speaker labels to their role (empty if unknown)

Only describe what is present in the excerpt. Never invent speakers or facts."#
                .to_string(),

            user: r#"Topic under analysis: {{topic}}

Analyze this excerpt and provide:
1. Summary of the excerpt
2. Key points discussed
3. Speaker identification (if multiple speakers)
4. Sentiment analysis
5. Technical complexity
6. Key topics covered

Excerpt:
{{segment}}"#
                .to_string(),
        }
    }
}

/// Prompts for cross-source synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisPrompts {
    pub system: String,
    pub user: String,
}

impl Default for SynthesisPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a research analyst combining findings from several independent sources into one report.

Respond with a JSON object:
- "narrative": object mapping a theme name to a short description. Always include "overall" for the overall narrative, and add keys such as "key_themes", "implications" and "data_points" when the material supports them
- "consensus": list of points the sources agree on
- "debate": list of points where sources disagree or evidence is contested
- "follow_up_questions": list of {{max_questions}} insightful follow-up questions

Base every statement on the provided material only."#
                .to_string(),

            user: r#"Synthesize the following findings about {{topic}}.

{{sources}}

When generating follow-up questions consider:
- Gaps in current research
- Emerging trends
- Potential implications
- Alternative perspectives
- Technical and non-technical aspects"#
                .to_string(),
        }
    }
}

/// Prompt sent to the research API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchPrompts {
    pub user: String,
}

impl Default for ResearchPrompts {
    fn default() -> Self {
        Self {
            user: r#"Perform a comprehensive analysis of: {{topic}}

Please structure your response in the following format:
1. Summary: A comprehensive overview of the topic
2. Key Insights: Bullet points of the most important findings
3. Sources: List of primary sources and their key contributions
4. Citations: Specific quotes or data points with attributions

Focus on providing factual, well-sourced information with a balance of technical and non-technical explanations."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }

            let synthesis_path = custom_path.join("synthesis.toml");
            if synthesis_path.exists() {
                let content = std::fs::read_to_string(&synthesis_path)?;
                prompts.synthesis = toml::from_str(&content)?;
            }

            let research_path = custom_path.join("research.toml");
            if research_path.exists() {
                let content = std::fs::read_to_string(&research_path)?;
                prompts.research = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
