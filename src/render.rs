use crate::captions;
use crate::config::{CaptionPosition, Config, FORMAT_DUAL_PANE, FORMAT_SINGLE_PANE};
use crate::error::{ClipError, Result};
use crate::ffmpeg;
use crate::moments::Moment;
use crate::transcribe::SpeechToText;
use crate::{logi, logok, logw};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;

const FILLER_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    SinglePane,
    DualPane,
}

#[derive(Debug, Clone)]
pub struct ClipLayoutConfig {
    pub mode: LayoutMode,
    pub subtitles_enabled: bool,
    pub font: String,
    pub text_color: String,
    pub caption_max_words: usize,
    pub caption_position: CaptionPosition,
}

impl ClipLayoutConfig {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mode = match cfg.video_type {
            FORMAT_SINGLE_PANE => LayoutMode::SinglePane,
            FORMAT_DUAL_PANE => LayoutMode::DualPane,
            other => {
                return Err(ClipError::RenderConfig {
                    reason: format!("unknown video_type {}", other),
                });
            }
        };

        Ok(Self {
            mode,
            subtitles_enabled: cfg.add_subtitles,
            font: cfg.font.clone(),
            text_color: cfg.text_color.clone(),
            caption_max_words: cfg.caption_max_words,
            caption_position: cfg.caption_position,
        })
    }
}

/// The unit of work for one rendered clip.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub moment: Moment,
    pub layout: ClipLayoutConfig,
    pub narration_audio: Option<PathBuf>,
}

pub async fn list_filler_assets(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Ok(out);
    }

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(OsStr::to_str) {
            if FILLER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                out.push(path);
            }
        }
    }

    out.sort();
    Ok(out)
}

/// Random pick for visual variety; the rng is injected so tests can pin
/// the choice.
pub fn select_filler<'a, R: Rng>(assets: &'a [PathBuf], rng: &mut R) -> Option<&'a Path> {
    if assets.is_empty() {
        return None;
    }
    Some(assets[rng.gen_range(0..assets.len())].as_path())
}

/// Turns one selected moment into a composited vertical clip: cut,
/// reformat, caption, and optionally layer narration. Every stage writes
/// its own temp artifact; the path of the last one produced is returned.
pub struct ClipTimelineBuilder<'a> {
    stt: &'a dyn SpeechToText,
    temp_dir: PathBuf,
    filler_dir: PathBuf,
    rng: StdRng,
}

impl<'a> ClipTimelineBuilder<'a> {
    pub fn new(
        stt: &'a dyn SpeechToText,
        temp_dir: impl Into<PathBuf>,
        filler_dir: impl Into<PathBuf>,
        seed: u64,
    ) -> Self {
        Self {
            stt,
            temp_dir: temp_dir.into(),
            filler_dir: filler_dir.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub async fn build(&mut self, job: &RenderJob, source: &Path, basename: &str) -> Result<PathBuf> {
        let moment = &job.moment;

        let cut_path = self.temp_dir.join(format!("{}.mp4", basename));
        logi(format!(
            "Cutting {}: {} ({:.2} - {:.2})",
            cut_path.display(),
            moment.caption,
            moment.start,
            moment.end
        ));
        if !ffmpeg::ffmpeg_cut_clip(source, moment.start, moment.end, &cut_path)
            .await
            .map_err(|err| ClipError::RenderConfig {
                reason: format!("clip extraction failed: {}", err),
            })?
        {
            return Err(ClipError::RenderConfig {
                reason: format!(
                    "empty extraction range {:.2}-{:.2}",
                    moment.start, moment.end
                ),
            });
        }

        let resized_path = self.temp_dir.join(format!("{}_resized.mp4", basename));
        self.reformat(job, &cut_path, &resized_path).await?;

        let mut current = resized_path;

        if job.layout.subtitles_enabled {
            let subtitled_path = self.temp_dir.join(format!("{}_subtitled.mp4", basename));
            match self.burn_captions(job, &current, &subtitled_path).await {
                Ok(true) => current = subtitled_path,
                Ok(false) => logi("No caption units for this clip; skipping subtitles".to_string()),
                Err(err) => {
                    // Captions are recoverable: the clip ships without them.
                    logw(format!("Subtitle pass failed ({}); rendering without subtitles", err));
                }
            }
        }

        if let Some(narration) = &job.narration_audio {
            let narrated_path = self.temp_dir.join(format!("{}_narrated.mp4", basename));
            match ffmpeg::ffmpeg_layer_narration(&current, narration, &narrated_path).await {
                Ok(true) => current = narrated_path,
                Ok(false) | Err(_) => {
                    logw("Narration layering failed; keeping original audio".to_string());
                }
            }
        }

        logok(format!("Built clip: {}", current.display()));
        Ok(current)
    }

    async fn reformat(&mut self, job: &RenderJob, input: &Path, output: &Path) -> Result<()> {
        let ok = match job.layout.mode {
            LayoutMode::SinglePane => ffmpeg::ffmpeg_single_pane(input, output)
                .await
                .map_err(|err| ClipError::RenderConfig {
                    reason: format!("single-pane reformat failed: {}", err),
                })?,
            LayoutMode::DualPane => {
                let assets = list_filler_assets(&self.filler_dir).await?;
                let filler = select_filler(&assets, &mut self.rng)
                    .ok_or_else(|| ClipError::RenderConfig {
                        reason: format!(
                            "no filler video found in '{}'",
                            self.filler_dir.display()
                        ),
                    })?
                    .to_path_buf();
                logi(format!("Filler asset: {}", filler.display()));
                ffmpeg::ffmpeg_dual_pane(input, &filler, output)
                    .await
                    .map_err(|err| ClipError::RenderConfig {
                        reason: format!("dual-pane reformat failed: {}", err),
                    })?
            }
        };

        if !ok {
            return Err(ClipError::RenderConfig {
                reason: "reformat produced no output".to_string(),
            });
        }
        Ok(())
    }

    async fn burn_captions(&self, job: &RenderJob, input: &Path, output: &Path) -> Result<bool> {
        let words = self.stt.transcribe_words(input).await?;
        if words.is_empty() {
            return Ok(false);
        }

        let units = captions::group_words(&words, job.layout.caption_max_words);
        let filter = captions::build_caption_filter(
            &units,
            &job.layout.font,
            &job.layout.text_color,
            job.layout.caption_position,
        );

        ffmpeg::ffmpeg_burn_captions(input, &filter, output)
            .await
            .map_err(|err| ClipError::RenderConfig {
                reason: format!("caption burn failed: {}", err),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptionPosition;

    fn test_config(video_type: u8) -> Config {
        serde_json::from_str(&format!(
            r#"{{"gemini_api_key": "k", "video_type": {}}}"#,
            video_type
        ))
        .unwrap()
    }

    #[test]
    fn layout_config_maps_video_type() {
        let single = ClipLayoutConfig::from_config(&test_config(1)).unwrap();
        assert_eq!(single.mode, LayoutMode::SinglePane);
        assert_eq!(single.caption_position, CaptionPosition::Bottom);

        let dual = ClipLayoutConfig::from_config(&test_config(2)).unwrap();
        assert_eq!(dual.mode, LayoutMode::DualPane);
    }

    #[test]
    fn unknown_video_type_is_a_render_config_error() {
        let err = ClipLayoutConfig::from_config(&test_config(7)).unwrap_err();
        assert!(matches!(err, ClipError::RenderConfig { .. }));
    }

    #[test]
    fn filler_selection_is_deterministic_under_a_seed() {
        let assets = vec![
            PathBuf::from("a.mp4"),
            PathBuf::from("b.mp4"),
            PathBuf::from("c.mp4"),
        ];

        let mut rng_one = StdRng::seed_from_u64(7);
        let mut rng_two = StdRng::seed_from_u64(7);
        assert_eq!(
            select_filler(&assets, &mut rng_one),
            select_filler(&assets, &mut rng_two)
        );
    }

    #[test]
    fn empty_filler_pool_selects_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(select_filler(&[], &mut rng).is_none());
    }

    #[tokio::test]
    async fn missing_filler_directory_lists_no_assets() {
        let assets = list_filler_assets(Path::new("does/not/exist")).await.unwrap();
        assert!(assets.is_empty());
    }

    #[tokio::test]
    async fn filler_listing_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["one.mp4", "two.MOV", "notes.txt", "three.avi"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let assets = list_filler_assets(dir.path()).await.unwrap();
        let names: Vec<String> = assets
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["one.mp4", "three.avi", "two.MOV"]);
    }
}
