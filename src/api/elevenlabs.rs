use crate::config::Config;
use crate::logw;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::path::Path;
use tokio::fs;

static NARRATION_CLEANUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,!?'"]"#).expect("narration cleanup regex"));

/// Strips emoji and decoration from caption text before synthesis; the
/// voices read them out loud otherwise.
pub fn clean_narration_text(text: &str) -> String {
    NARRATION_CLEANUP_RE.replace_all(text, "").trim().to_string()
}

pub async fn elevenlabs_tts_to_mp3(
    client: &Client,
    cfg: &Config,
    text: &str,
    out_mp3_path: &Path,
) -> Result<bool> {
    let narration = clean_narration_text(text);
    if narration.is_empty() {
        logw("Narration text empty after cleanup; skipping TTS".to_string());
        return Ok(false);
    }

    let url = format!(
        "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
        cfg.eleven_voice_id
    );

    let body = serde_json::json!({
        "text": narration,
        "model_id": cfg.eleven_model_id,
    });

    let resp = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("xi-api-key", &cfg.elevenlabs_api_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await
        .context("ElevenLabs request failed")?;

    if !resp.status().is_success() {
        logw(format!("ElevenLabs TTS failed HTTP {}", resp.status().as_u16()));
        return Ok(false);
    }

    let bytes = resp.bytes().await.context("ElevenLabs response read failed")?;
    if let Some(parent) = out_mp3_path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    fs::write(out_mp3_path, &bytes).await?;

    Ok(fs::metadata(out_mp3_path).await.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_drops_emoji_and_keeps_punctuation() {
        let cleaned = clean_narration_text("This celebrity just exposed the truth! \u{1F440}");
        assert_eq!(cleaned, "This celebrity just exposed the truth!");
    }

    #[test]
    fn cleanup_preserves_plain_sentences() {
        let text = "Wait, what happened next? You won't believe it.";
        assert_eq!(clean_narration_text(text), text);
    }
}
