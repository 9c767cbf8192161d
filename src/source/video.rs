//! Video source: YouTube search and subtitle transcripts.

use super::{validate_topic, SourceAdapter, SourceKind, SourceResult};
use crate::chunking::Chunker;
use crate::config::VideoSettings;
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument, warn};

/// A video found for a topic, with its transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub url: String,
    /// Plain-text transcript (empty when no subtitles exist).
    pub transcript: String,
    /// Extra provider metadata (duration, views, upload date...).
    pub metadata: BTreeMap<String, String>,
}

/// Trait for video search providers.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Find videos on a topic, most relevant first.
    async fn search(&self, topic: &str) -> std::result::Result<Vec<VideoItem>, ProviderError>;
}

/// Video provider backed by yt-dlp (search + subtitle download).
pub struct YtDlpVideoProvider {
    max_videos: usize,
    language: String,
    temp_dir: PathBuf,
}

impl YtDlpVideoProvider {
    pub fn new(settings: &VideoSettings, temp_dir: PathBuf) -> Self {
        Self {
            max_videos: settings.max_videos.max(1),
            language: settings.subtitle_language.clone(),
            temp_dir,
        }
    }

    async fn run_ytdlp(args: &[&str]) -> std::result::Result<std::process::Output, ProviderError> {
        tokio::process::Command::new("yt-dlp")
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProviderError::Upstream(
                        "yt-dlp not found. Please install it and ensure it's in your PATH.".to_string(),
                    )
                } else {
                    ProviderError::Upstream(format!("Failed to run yt-dlp: {}", e))
                }
            })
    }

    /// Search YouTube and return bare video entries (no transcript yet).
    async fn search_entries(&self, topic: &str) -> std::result::Result<Vec<VideoItem>, ProviderError> {
        let query = format!("ytsearch{}:{}", self.max_videos, topic);
        let output = Self::run_ytdlp(&[
            "--dump-json",
            "--no-download",
            "--no-warnings",
            "--flat-playlist",
            &query,
        ])
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_ytdlp_failure(&stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_search_output(&stdout))
    }

    /// Download subtitles for one video and convert them to plain text.
    async fn fetch_transcript(&self, video: &VideoItem) -> std::result::Result<String, ProviderError> {
        std::fs::create_dir_all(&self.temp_dir)
            .map_err(|e| ProviderError::Upstream(format!("Failed to create temp dir: {}", e)))?;
        let dir = tempfile::tempdir_in(&self.temp_dir)
            .map_err(|e| ProviderError::Upstream(format!("Failed to create temp dir: {}", e)))?;

        let template = dir.path().join("%(id)s.%(ext)s");
        let template = template.to_string_lossy();

        let output = Self::run_ytdlp(&[
            "--skip-download",
            "--write-auto-subs",
            "--write-subs",
            "--sub-langs",
            &self.language,
            "--sub-format",
            "vtt",
            "--no-warnings",
            "-o",
            &template,
            &video.url,
        ])
        .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_ytdlp_failure(&stderr));
        }

        match find_subtitle_file(dir.path())? {
            Some(path) => {
                let vtt = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| ProviderError::Upstream(format!("Failed to read subtitles: {}", e)))?;
                Ok(vtt_to_text(&vtt))
            }
            None => Ok(String::new()),
        }
    }
}

#[async_trait]
impl VideoProvider for YtDlpVideoProvider {
    #[instrument(skip(self))]
    async fn search(&self, topic: &str) -> std::result::Result<Vec<VideoItem>, ProviderError> {
        let mut videos = self.search_entries(topic).await?;
        info!("Found {} videos", videos.len());

        for video in &mut videos {
            match self.fetch_transcript(video).await {
                Ok(transcript) => video.transcript = transcript,
                Err(e) => warn!("No transcript for {}: {}", video.id, e),
            }
        }

        Ok(videos)
    }
}

fn classify_ytdlp_failure(stderr: &str) -> ProviderError {
    let lower = stderr.to_lowercase();
    if lower.contains("unable to download") || lower.contains("timed out") || lower.contains("connection") {
        ProviderError::Network(stderr.trim().to_string())
    } else {
        ProviderError::Upstream(stderr.trim().to_string())
    }
}

fn find_subtitle_file(dir: &Path) -> std::result::Result<Option<PathBuf>, ProviderError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ProviderError::Upstream(format!("Failed to list subtitles: {}", e)))?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| path.extension().is_some_and(|ext| ext == "vtt")))
}

/// Parse `yt-dlp --dump-json --flat-playlist` output, one JSON object per line.
fn parse_search_output(stdout: &str) -> Vec<VideoItem> {
    let mut videos = Vec::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let Ok(json) = serde_json::from_str::<serde_json::Value>(line) else {
            debug!("Skipping unparseable yt-dlp line");
            continue;
        };

        let Some(id) = json["id"].as_str() else {
            continue;
        };

        let mut metadata = BTreeMap::new();
        if let Some(duration) = json["duration"].as_f64() {
            metadata.insert("duration_seconds".to_string(), (duration as u64).to_string());
        }
        if let Some(views) = json["view_count"].as_u64() {
            metadata.insert("view_count".to_string(), views.to_string());
        }

        videos.push(VideoItem {
            id: id.to_string(),
            title: json["title"].as_str().unwrap_or("Unknown Title").to_string(),
            channel: json["channel"]
                .as_str()
                .or_else(|| json["uploader"].as_str())
                .unwrap_or_default()
                .to_string(),
            url: format!("https://www.youtube.com/watch?v={}", id),
            transcript: String::new(),
            metadata,
        });
    }

    videos
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid regex"))
}

/// Convert WebVTT subtitles to plain text.
///
/// Drops the header, cue timings, numeric cue ids, NOTE/STYLE blocks and inline
/// tags. Rolling auto-captions repeat the previous line, so consecutive
/// duplicates are collapsed.
pub fn vtt_to_text(vtt: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_header = true;
    let mut skipping_block = false;

    for raw in vtt.lines() {
        let line = raw.trim();

        if in_header {
            if line.is_empty() {
                in_header = false;
            }
            continue;
        }

        if line.is_empty() {
            skipping_block = false;
            continue;
        }
        if skipping_block {
            continue;
        }
        if line.starts_with("NOTE") || line == "STYLE" || line == "REGION" {
            skipping_block = true;
            continue;
        }
        if line.contains("-->") || line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let text = tag_regex().replace_all(line, "");
        let text = text
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&nbsp;", " ");
        let text = text.trim();

        if text.is_empty() || lines.last().is_some_and(|last| last == text) {
            continue;
        }
        lines.push(text.to_string());
    }

    lines.join(" ")
}

/// Adapter turning found videos into chunked source results.
pub struct VideoAdapter {
    provider: Arc<dyn VideoProvider>,
    chunker: Chunker,
}

impl VideoAdapter {
    pub fn new(provider: Arc<dyn VideoProvider>, chunker: Chunker) -> Self {
        Self { provider, chunker }
    }
}

#[async_trait]
impl SourceAdapter for VideoAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    #[instrument(skip(self))]
    async fn fetch(&self, topic: &str) -> Result<SourceResult> {
        let topic = validate_topic(topic)?;
        let videos = self.provider.search(topic).await?;

        let mut result = SourceResult::new(SourceKind::Video, Vec::new())
            .with_metadata("video.count", videos.len().to_string());

        for (i, video) in videos.iter().enumerate() {
            result.segments.extend(self.chunker.split(&video.transcript));

            let prefix = format!("video.{}", i);
            result.metadata.insert(format!("{}.id", prefix), video.id.clone());
            result.metadata.insert(format!("{}.title", prefix), video.title.clone());
            result.metadata.insert(format!("{}.channel", prefix), video.channel.clone());
            result.metadata.insert(format!("{}.url", prefix), video.url.clone());
            for (key, value) in &video.metadata {
                result.metadata.insert(format!("{}.{}", prefix, key), value.clone());
            }
        }

        debug!("Video source produced {} segments", result.segments.len());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingMode;
    use crate::provider::fake::StaticVideoProvider;

    #[test]
    fn test_vtt_to_text() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n\
            NOTE generated automatically\nby the platform\n\n\
            1\n00:00:00.000 --> 00:00:02.000\nquantum <c>computers</c> use\n\n\
            2\n00:00:02.000 --> 00:00:04.000\nquantum computers use\nqubits &amp; gates\n";

        assert_eq!(vtt_to_text(vtt), "quantum computers use qubits & gates");
    }

    #[test]
    fn test_vtt_empty() {
        assert_eq!(vtt_to_text("WEBVTT\n\n"), "");
    }

    #[test]
    fn test_parse_search_output() {
        let stdout = r#"{"id": "abc123def45", "title": "Qubits explained", "channel": "Science", "duration": 615.0}
not json
{"id": "zzz999yyy88", "title": "Quantum news", "uploader": "News"}
"#;

        let videos = parse_search_output(stdout);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123def45");
        assert_eq!(videos[0].metadata.get("duration_seconds").map(String::as_str), Some("615"));
        assert_eq!(videos[1].channel, "News");
    }

    #[tokio::test]
    async fn test_adapter_concatenates_videos_in_order() {
        let provider = StaticVideoProvider::new(vec![
            VideoItem {
                id: "a".to_string(),
                title: "First".to_string(),
                transcript: "alpha beta gamma".to_string(),
                ..Default::default()
            },
            VideoItem {
                id: "b".to_string(),
                title: "Second".to_string(),
                transcript: "delta".to_string(),
                ..Default::default()
            },
        ]);
        let adapter = VideoAdapter::new(Arc::new(provider), Chunker::new(ChunkingMode::Words, 2));

        let result = adapter.fetch("quantum").await.unwrap();
        assert_eq!(result.segments, vec!["alpha beta", "gamma", "delta"]);
        assert_eq!(result.metadata.get("video.count").map(String::as_str), Some("2"));
        assert_eq!(result.metadata.get("video.1.title").map(String::as_str), Some("Second"));
    }

    #[tokio::test]
    async fn test_no_videos_is_empty_not_error() {
        let adapter = VideoAdapter::new(
            Arc::new(StaticVideoProvider::new(Vec::new())),
            Chunker::new(ChunkingMode::Words, 10),
        );

        let result = adapter.fetch("obscure topic").await.unwrap();
        assert!(result.is_empty());
    }
}
