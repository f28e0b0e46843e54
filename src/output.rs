use crate::error::{ClipError, Result};
use crate::logok;
use crate::moments::Moment;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Collapses a model-supplied title into a filesystem-safe slug.
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::new();
    for ch in title.trim().chars() {
        match ch {
            ' ' | '\t' => out.push('_'),
            _ if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' => {
                out.push(ch.to_ascii_lowercase());
            }
            _ => {}
        }
    }

    if out.is_empty() {
        out.push_str("clip");
    }
    out
}

pub fn render_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Deterministic artifact name: title slug plus render timestamp, shared
/// by the clip and its metadata record.
pub fn clip_basename(video_title: &str, timestamp: &str) -> String {
    format!("{}_{}", sanitize_title(video_title), timestamp)
}

/// Writes the per-clip metadata record next to the renders.
pub async fn save_clip_metadata(
    moment: &Moment,
    metadata_dir: &Path,
    basename: &str,
) -> Result<PathBuf> {
    let dest = metadata_dir.join(format!("{}.json", basename));
    let body = serde_json::to_string_pretty(moment)?;

    fs::create_dir_all(metadata_dir)
        .await
        .map_err(|err| ClipError::Persistence {
            path: metadata_dir.to_path_buf(),
            reason: err.to_string(),
        })?;
    fs::write(&dest, body)
        .await
        .map_err(|err| ClipError::Persistence {
            path: dest.clone(),
            reason: err.to_string(),
        })?;

    logok(format!("Clip metadata saved to {}", dest.display()));
    Ok(dest)
}

/// Moves a finished render out of the temp folder. On failure the caller
/// keeps the artifact where it is; losing the render would be worse than
/// leaving it in temp.
pub async fn publish_render(temp_path: &Path, videos_dir: &Path, basename: &str) -> Result<PathBuf> {
    let dest = videos_dir.join(format!("{}.mp4", basename));

    fs::create_dir_all(videos_dir)
        .await
        .map_err(|err| ClipError::Persistence {
            path: videos_dir.to_path_buf(),
            reason: err.to_string(),
        })?;
    fs::rename(temp_path, &dest)
        .await
        .map_err(|err| ClipError::Persistence {
            path: temp_path.to_path_buf(),
            reason: err.to_string(),
        })?;

    logok(format!("Moved {} to {}", temp_path.display(), dest.display()));
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moment() -> Moment {
        Moment {
            start: 12.0,
            end: 44.0,
            transcript: "the whole excerpt".to_string(),
            caption: "You won't believe this".to_string(),
            video_title: "Celebrity Exposed!".to_string(),
        }
    }

    #[test]
    fn titles_become_safe_slugs() {
        assert_eq!(sanitize_title("Celebrity Exposed!"), "celebrity_exposed");
        assert_eq!(sanitize_title("  why/me? "), "whyme");
        assert_eq!(sanitize_title("$$$"), "clip");
        assert_eq!(sanitize_title("already_fine-01"), "already_fine-01");
    }

    #[test]
    fn basenames_combine_slug_and_timestamp() {
        assert_eq!(
            clip_basename("Celebrity Exposed!", "20260806_120000"),
            "celebrity_exposed_20260806_120000"
        );
    }

    #[tokio::test]
    async fn metadata_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_clip_metadata(&moment(), dir.path(), "celebrity_exposed_x")
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let read_back: Moment = serde_json::from_str(&raw).unwrap();
        assert_eq!(read_back, moment());
    }

    #[tokio::test]
    async fn publish_moves_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let temp_path = dir.path().join("render.mp4");
        std::fs::write(&temp_path, b"fake video").unwrap();

        let videos = dir.path().join("videos");
        let dest = publish_render(&temp_path, &videos, "clip_1").await.unwrap();

        assert!(!temp_path.exists());
        assert!(dest.exists());
        assert_eq!(dest.file_name().unwrap(), "clip_1.mp4");
    }

    #[tokio::test]
    async fn publish_failure_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp4");
        let err = publish_render(&missing, &dir.path().join("videos"), "clip_1")
            .await
            .unwrap_err();
        assert!(matches!(err, ClipError::Persistence { .. }));
    }
}
