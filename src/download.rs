use crate::error::{ClipError, Result};
use crate::{logi, logok};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Produces a local media file for the given source. A plain path to an
/// existing file is used as-is; anything else goes through yt-dlp. No
/// file at the end means the run cannot proceed.
pub async fn acquire_video(source: &str, temp_dir: &Path) -> Result<PathBuf> {
    let local = Path::new(source);
    if local.is_file() {
        logok(format!("Using local source file: {}", local.display()));
        return Ok(local.to_path_buf());
    }

    let dest = temp_dir.join("temp_video.mp4");
    logi(format!("Downloading video from: {}", source));

    let status = Command::new("yt-dlp")
        .args(["-f", "best", "-o"])
        .arg(&dest)
        .arg(source)
        .status()
        .await
        .map_err(|err| ClipError::Acquisition {
            url: source.to_string(),
            reason: format!("failed to launch yt-dlp: {}", err),
        })?;

    if !status.success() {
        return Err(ClipError::Acquisition {
            url: source.to_string(),
            reason: format!("yt-dlp exited with {}", status),
        });
    }
    if !dest.is_file() {
        return Err(ClipError::Acquisition {
            url: source.to_string(),
            reason: "yt-dlp reported success but produced no file".to_string(),
        });
    }

    logok(format!("Video downloaded: {}", dest.display()));
    Ok(dest)
}
