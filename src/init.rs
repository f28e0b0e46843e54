use std::io;
use std::path::Path;
use tokio::fs;
use walkdir::WalkDir;

pub const TEMP_DIR: &str = "temp";
pub const VIDEOS_DIR: &str = "videos";
pub const METADATA_DIR: &str = "metadata";
pub const FILLERS_DIR: &str = "video_fillers";
pub const NARRATION_DIR: &str = "narration";

const REQUIRED_DIRS: &[&str] = &[TEMP_DIR, VIDEOS_DIR, METADATA_DIR, FILLERS_DIR, NARRATION_DIR];

pub async fn ensure_directories() -> io::Result<()> {
    for dir in REQUIRED_DIRS {
        if !Path::new(dir).exists() {
            fs::create_dir_all(dir).await?;
            eprintln!("[INFO] Created directory: {}", dir);
        }
    }
    Ok(())
}

/// Removes everything under `dir_path` without removing the directory
/// itself. Individual failures are skipped; leftover temp files from a
/// crashed run must not block the next one.
pub async fn clear_directory_contents(dir_path: &Path) -> io::Result<()> {
    if !fs::metadata(dir_path).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Ok(());
    }

    for entry in WalkDir::new(dir_path).min_depth(1).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir(path).await.ok();
        } else {
            fs::remove_file(path).await.ok();
        }
    }

    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

pub async fn check_yt_dlp() -> bool {
    match tokio::process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
