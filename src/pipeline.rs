use crate::api::{elevenlabs, gemini::GeminiClient};
use crate::config::Config;
use crate::error::{ClipError, Result};
use crate::moments::{self, Moment};
use crate::output;
use crate::render::{ClipLayoutConfig, ClipTimelineBuilder, RenderJob};
use crate::transcribe::{SpeechToText, WhisperCli};
use crate::transcript;
use crate::{init, logi, logok, logw};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Accounting for one run: how many moments were asked for, how many
/// survived extraction, and how many clips actually rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub requested: usize,
    pub extracted: usize,
    pub rendered: usize,
}

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn synthesize_narration(
    client: &reqwest::Client,
    cfg: &Config,
    moment: &Moment,
    basename: &str,
) -> Option<PathBuf> {
    let mp3 = Path::new(init::NARRATION_DIR).join(format!("{}.mp3", basename));
    match elevenlabs::elevenlabs_tts_to_mp3(client, cfg, &moment.caption, &mp3).await {
        Ok(true) => Some(mp3),
        Ok(false) => {
            logw(format!("TTS produced no narration for '{}'", moment.video_title));
            None
        }
        Err(err) => {
            logw(format!("TTS failed for '{}': {}", moment.video_title, err));
            None
        }
    }
}

/// Runs the whole pipeline once: acquire, transcribe, extract moments,
/// then render each selected moment in sequence. Failures local to one
/// chunk or one moment are logged and skipped; only acquisition and
/// transcription abort the run.
pub async fn run_pipeline(cfg: &Config, source: &str) -> Result<RunSummary> {
    init::ensure_directories().await?;

    let temp_dir = Path::new(init::TEMP_DIR);
    logi("Clearing temp/ folder...".to_string());
    if let Err(err) = init::clear_directory_contents(temp_dir).await {
        logw(format!("Failed to fully clear temp/ (continuing anyway): {}", err));
    }

    let client = reqwest::Client::builder().build()?;

    // Acquisition: fatal on failure.
    let video_path = crate::download::acquire_video(source, temp_dir).await?;
    let downloaded = video_path.starts_with(temp_dir);

    // Transcription: fatal, and the acquired media is cleaned up first.
    let stt = WhisperCli::new(cfg, temp_dir);
    let segments = match stt.transcribe(&video_path).await {
        Ok(segments) => segments,
        Err(err) => {
            if downloaded {
                let _ = fs::remove_file(&video_path).await;
            }
            return Err(err);
        }
    };
    if segments.is_empty() {
        if downloaded {
            let _ = fs::remove_file(&video_path).await;
        }
        return Err(ClipError::Transcription {
            media: video_path,
            reason: "no transcript segments produced".to_string(),
        });
    }
    logok(format!("Transcript ready: {} segments", segments.len()));

    let chunks = transcript::chunk_transcript(&segments, cfg.chunk_duration_limit);
    let allocations = transcript::distribute_moments(cfg.number_of_moments, chunks.len());
    logi(format!(
        "Transcript split into {} chunk(s); moment allocation: {:?}",
        chunks.len(),
        allocations
    ));

    let gateway = GeminiClient::new(client.clone(), cfg);
    logi(format!(
        "Model gateway pacing: one call per chunk, {:.1}s apart",
        gateway.min_interval().as_secs_f64()
    ));
    let per_chunk = gateway.extract_moments(&chunks, &allocations, cfg).await;
    let extracted: usize = per_chunk.iter().map(Vec::len).sum();

    let selected = moments::aggregate_moments(per_chunk, cfg.max_clips);
    logok(format!(
        "Extracted {} moment(s) of {} requested; rendering {}",
        extracted,
        cfg.number_of_moments,
        selected.len()
    ));

    let layout = ClipLayoutConfig::from_config(cfg)?;
    let mut builder = ClipTimelineBuilder::new(
        &stt,
        temp_dir,
        Path::new(init::FILLERS_DIR),
        now_seed(),
    );

    let mut rendered = 0usize;
    for (index, moment) in selected.iter().enumerate() {
        let clip_no = index + 1;
        if moment.end <= moment.start {
            logw(format!("Skipping clip {} (end <= start)", clip_no));
            continue;
        }

        logi(format!(
            "\n=== Clip {}/{}: {} ===",
            clip_no,
            selected.len(),
            moment.video_title
        ));

        let timestamp = output::render_timestamp();
        let basename = output::clip_basename(&moment.video_title, &timestamp);

        let narration_audio = if cfg.enable_narration {
            synthesize_narration(&client, cfg, moment, &basename).await
        } else {
            None
        };

        let job = RenderJob {
            moment: moment.clone(),
            layout: layout.clone(),
            narration_audio,
        };

        let final_path = match builder.build(&job, &video_path, &basename).await {
            Ok(path) => path,
            Err(err) => {
                // Fatal for this moment only.
                logw(format!("Render failed for clip {}: {}", clip_no, err));
                continue;
            }
        };

        if let Err(err) =
            output::save_clip_metadata(moment, Path::new(init::METADATA_DIR), &basename).await
        {
            logw(format!("Metadata write failed for clip {}: {}", clip_no, err));
        }

        match output::publish_render(&final_path, Path::new(init::VIDEOS_DIR), &basename).await {
            Ok(dest) => logok(format!("Clip {} published: {}", clip_no, dest.display())),
            Err(err) => logw(format!(
                "Move failed for clip {} ({}); artifact kept at {}",
                clip_no,
                err,
                final_path.display()
            )),
        }

        rendered += 1;
    }

    let summary = RunSummary {
        requested: cfg.number_of_moments,
        extracted,
        rendered,
    };
    logok(format!(
        "\nDone. Moments: {}/{} extracted, clips rendered: {}",
        summary.extracted, summary.requested, summary.rendered
    ));

    Ok(summary)
}
