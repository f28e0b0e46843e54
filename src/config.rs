use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

pub const FORMAT_SINGLE_PANE: u8 = 1;
pub const FORMAT_DUAL_PANE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    Top,
    Center,
    Bottom,
}

impl Default for CaptionPosition {
    fn default() -> Self {
        CaptionPosition::Bottom
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "gemini_api_key")]
    pub gemini_key: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(rename = "number_of_viral_moments")]
    #[serde(default = "default_number_of_moments")]
    pub number_of_moments: usize,
    #[serde(rename = "minimum_moment_time")]
    #[serde(default = "default_min_moment_time")]
    pub min_moment_time: f64,
    #[serde(rename = "maximum_moment_time")]
    #[serde(default = "default_max_moment_time")]
    pub max_moment_time: f64,

    #[serde(default = "default_chunk_duration_limit")]
    pub chunk_duration_limit: f64,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_video_type")]
    pub video_type: u8,
    #[serde(default = "default_add_subtitles")]
    pub add_subtitles: bool,
    #[serde(default = "default_caption_max_words")]
    pub caption_max_words: usize,
    #[serde(default)]
    pub caption_position: CaptionPosition,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,

    #[serde(default = "default_max_clips")]
    pub max_clips: usize,

    #[serde(default)]
    pub enable_narration: bool,
    #[serde(default)]
    pub elevenlabs_api_key: String,
    #[serde(default = "default_voice_id")]
    pub eleven_voice_id: String,
    #[serde(default = "default_model_id")]
    pub eleven_model_id: String,

    #[serde(default = "default_whisper_command")]
    pub whisper_command: String,
}

fn default_gemini_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_number_of_moments() -> usize {
    5
}

fn default_min_moment_time() -> f64 {
    20.0
}

fn default_max_moment_time() -> f64 {
    60.0
}

fn default_chunk_duration_limit() -> f64 {
    600.0
}

fn default_requests_per_minute() -> u32 {
    2
}

fn default_video_type() -> u8 {
    FORMAT_SINGLE_PANE
}

fn default_add_subtitles() -> bool {
    true
}

fn default_caption_max_words() -> usize {
    4
}

fn default_font() -> String {
    "Arial".to_string()
}

fn default_text_color() -> String {
    "white".to_string()
}

fn default_max_clips() -> usize {
    5
}

fn default_voice_id() -> String {
    "onwK4e9ZLuTAKqWW03F9".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_whisper_command() -> String {
    "whisper".to_string()
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        let config: Config = serde_json::from_str(&content)?;

        if config.gemini_key.is_empty() {
            anyhow::bail!("config.json: gemini_api_key missing");
        }
        if config.video_type != FORMAT_SINGLE_PANE && config.video_type != FORMAT_DUAL_PANE {
            anyhow::bail!(
                "config.json: video_type must be {} or {}",
                FORMAT_SINGLE_PANE,
                FORMAT_DUAL_PANE
            );
        }
        if config.enable_narration && config.elevenlabs_api_key.is_empty() {
            anyhow::bail!("config.json: elevenlabs_api_key required when enable_narration is set");
        }
        if config.min_moment_time >= config.max_moment_time {
            anyhow::bail!("config.json: minimum_moment_time must be below maximum_moment_time");
        }
        if config.chunk_duration_limit <= 0.0 {
            anyhow::bail!("config.json: chunk_duration_limit must be positive");
        }
        if config.requests_per_minute == 0 {
            anyhow::bail!("config.json: requests_per_minute must be at least 1");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let json = r#"{"gemini_api_key": "k"}"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.gemini_model, "gemini-1.5-pro");
        assert_eq!(cfg.number_of_moments, 5);
        assert_eq!(cfg.video_type, FORMAT_SINGLE_PANE);
        assert_eq!(cfg.max_clips, 5);
        assert_eq!(cfg.caption_position, CaptionPosition::Bottom);
        assert!(cfg.add_subtitles);
        assert!(!cfg.enable_narration);
    }

    #[test]
    fn parses_original_key_names() {
        let json = r#"{
            "gemini_api_key": "k",
            "number_of_viral_moments": 8,
            "minimum_moment_time": 15,
            "maximum_moment_time": 45,
            "video_type": 2,
            "add_subtitles": false,
            "caption_position": "top"
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.number_of_moments, 8);
        assert_eq!(cfg.min_moment_time, 15.0);
        assert_eq!(cfg.max_moment_time, 45.0);
        assert_eq!(cfg.video_type, FORMAT_DUAL_PANE);
        assert!(!cfg.add_subtitles);
        assert_eq!(cfg.caption_position, CaptionPosition::Top);
    }
}
