use crate::config::Config;
use crate::error::{ClipError, Result};
use crate::transcript::{self, TranscriptSegment, WordSpan};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

/// Speech-to-text collaborator. Implementations produce ordered,
/// timestamped text for a media file; word-level granularity feeds the
/// caption timeline.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>>;
    async fn transcribe_words(&self, media: &Path) -> Result<Vec<WordSpan>>;
}

/// Shells out to a Whisper-compatible CLI that writes a JSON transcript
/// next to the work dir. Word timestamps are requested when available;
/// otherwise word spans are derived from segment spans.
pub struct WhisperCli {
    command: String,
    work_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    start: f64,
    end: f64,
    word: String,
}

impl WhisperCli {
    pub fn new(cfg: &Config, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: cfg.whisper_command.clone(),
            work_dir: work_dir.into(),
        }
    }

    fn transcription_error(&self, media: &Path, reason: impl Into<String>) -> ClipError {
        ClipError::Transcription {
            media: media.to_path_buf(),
            reason: reason.into(),
        }
    }

    async fn run_whisper(&self, media: &Path, word_timestamps: bool) -> Result<WhisperOutput> {
        info!("Transcribing {} (word timestamps: {})", media.display(), word_timestamps);

        let mut cmd = Command::new(&self.command);
        cmd.arg(media)
            .args(["--model", "small"])
            .args(["--output_format", "json"])
            .arg("--output_dir")
            .arg(&self.work_dir);
        if word_timestamps {
            cmd.args(["--word_timestamps", "True"]);
        }

        let status = cmd
            .status()
            .await
            .map_err(|err| self.transcription_error(media, format!("failed to launch {}: {}", self.command, err)))?;
        if !status.success() {
            return Err(self.transcription_error(media, format!("{} exited with {}", self.command, status)));
        }

        let stem = media
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| self.transcription_error(media, "media path has no file stem"))?;
        let json_path = self.work_dir.join(format!("{}.json", stem));

        let raw = fs::read_to_string(&json_path)
            .await
            .map_err(|err| self.transcription_error(media, format!("missing transcript {}: {}", json_path.display(), err)))?;
        debug!("Read transcript JSON: {} ({} bytes)", json_path.display(), raw.len());
        serde_json::from_str(&raw)
            .map_err(|err| self.transcription_error(media, format!("bad transcript JSON: {}", err)))
    }
}

#[async_trait]
impl SpeechToText for WhisperCli {
    async fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>> {
        let output = self.run_whisper(media, false).await?;
        Ok(output
            .segments
            .into_iter()
            .map(|seg| TranscriptSegment {
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
            })
            .collect())
    }

    async fn transcribe_words(&self, media: &Path) -> Result<Vec<WordSpan>> {
        let output = self.run_whisper(media, true).await?;

        let mut words: Vec<WordSpan> = output
            .segments
            .iter()
            .flat_map(|seg| seg.words.iter())
            .map(|w| WordSpan {
                start: w.start,
                end: w.end,
                word: w.word.trim().to_string(),
            })
            .collect();

        if words.is_empty() {
            let segments: Vec<TranscriptSegment> = output
                .segments
                .into_iter()
                .map(|seg| TranscriptSegment {
                    start: seg.start,
                    end: seg.end,
                    text: seg.text.trim().to_string(),
                })
                .collect();
            words = transcript::words_from_segments(&segments);
        }

        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whisper_json_parses_segments_and_words() {
        let raw = r#"{
            "segments": [
                {"start": 0.0, "end": 4.2, "text": " hello there ",
                 "words": [{"start": 0.0, "end": 1.9, "word": " hello"},
                           {"start": 1.9, "end": 4.2, "word": " there"}]},
                {"start": 4.2, "end": 6.0, "text": "again"}
            ]
        }"#;
        let parsed: WhisperOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[0].words.len(), 2);
        assert!(parsed.segments[1].words.is_empty());
        assert_eq!(parsed.segments[0].words[1].word.trim(), "there");
    }
}
