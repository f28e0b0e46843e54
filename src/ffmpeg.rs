use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;

pub const CANVAS_W: i32 = 1080;
pub const CANVAS_H: i32 = 1920;
pub const PANE_H: i32 = CANVAS_H / 2;

// Fraction of the filler's height taken above the natural bottom crop
// line, so letterboxing baked into filler footage stays off screen.
const FILLER_BOTTOM_MARGIN: f64 = 0.15;

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd.status().await.context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

pub async fn ffprobe_video_dimensions(path: &Path) -> Result<(i32, i32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe execution failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let mut parts = text.split('x');
    let w = parts
        .next()
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(0);
    let h = parts
        .next()
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(0);

    if w <= 0 || h <= 0 {
        return Err(anyhow::anyhow!("Invalid dimensions"));
    }

    Ok((w, h))
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

/// Cuts `[start_s, end_s)` out of the source into a standalone clip.
pub async fn ffmpeg_cut_clip(
    input: &Path,
    start_s: f64,
    end_s: f64,
    out_mp4: &Path,
) -> Result<bool> {
    if end_s - start_s <= 0.1 {
        return Ok(false);
    }

    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        format!("{:.3}", start_s),
        "-to".to_string(),
        format!("{:.3}", end_s),
        "-i".to_string(),
        input.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        out_mp4.display().to_string(),
    ];

    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}

/// Contain-fit onto the vertical canvas: scale down preserving aspect
/// ratio, then pad centered on black. Output is always exactly the
/// canvas resolution.
pub fn build_single_pane_filter() -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,setsar=1",
        w = CANVAS_W,
        h = CANVAS_H
    )
}

pub async fn ffmpeg_single_pane(input: &Path, out_mp4: &Path) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-vf".to_string(),
        build_single_pane_filter(),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "0:a?".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        out_mp4.display().to_string(),
    ];

    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}

/// Where to crop the bottom pane out of a filler asset: the filler is
/// scaled up to at least the canvas width first, then the pane is taken
/// starting a margin above the bottom edge. Returns the scaled filler
/// dimensions and the crop's y offset.
pub fn filler_crop_geometry(filler_w: i32, filler_h: i32) -> (i32, i32, i32) {
    let (scaled_w, scaled_h) = if filler_w < CANVAS_W {
        let factor = CANVAS_W as f64 / filler_w as f64;
        (CANVAS_W, (filler_h as f64 * factor).round() as i32)
    } else {
        (filler_w, filler_h)
    };

    let margin = (scaled_h as f64 * FILLER_BOTTOM_MARGIN) as i32;
    let y = (scaled_h - PANE_H - margin).max(0);
    (scaled_w, scaled_h, y)
}

/// Two stacked panes on a black canvas: the main clip cover-fitted into
/// the top half, the filler cropped into the bottom half. The overlays
/// pass through after their input ends, so a short filler leaves black
/// instead of freezing the composite.
pub fn build_dual_pane_filter(filler_w: i32, filler_h: i32, duration: f64) -> String {
    let (fw, fh, crop_y) = filler_crop_geometry(filler_w, filler_h);
    format!(
        "[0:v]scale={w}:{p}:force_original_aspect_ratio=increase,crop={w}:{p},setsar=1[main];\
         [1:v]trim=duration={d:.3},setpts=PTS-STARTPTS,scale={fw}:{fh},crop={w}:{p}:0:{y},setsar=1[fill];\
         color=c=black:size={w}x{h}:duration={d:.3}[base];\
         [base][main]overlay=0:0:eof_action=pass[upper];\
         [upper][fill]overlay=0:{p}:eof_action=pass[v]",
        w = CANVAS_W,
        h = CANVAS_H,
        p = PANE_H,
        d = duration,
        fw = fw,
        fh = fh,
        y = crop_y,
    )
}

pub async fn ffmpeg_dual_pane(input: &Path, filler: &Path, out_mp4: &Path) -> Result<bool> {
    let (filler_w, filler_h) = ffprobe_video_dimensions(filler).await?;
    let duration = ffprobe_duration_seconds(input).await?;

    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-i".to_string(),
        filler.display().to_string(),
        "-filter_complex".to_string(),
        build_dual_pane_filter(filler_w, filler_h, duration),
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "0:a?".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-shortest".to_string(),
        out_mp4.display().to_string(),
    ];

    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}

/// Burns a prebuilt drawtext chain onto the clip.
pub async fn ffmpeg_burn_captions(input: &Path, filter: &str, out_mp4: &Path) -> Result<bool> {
    if filter.is_empty() {
        return Ok(false);
    }

    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-vf".to_string(),
        filter.to_string(),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "0:a?".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        out_mp4.display().to_string(),
    ];

    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}

/// Ducking graph: the original track is silenced for the narration's
/// span and untouched afterwards, then the narration is mixed on top as
/// an additive layer. Total duration follows the original track.
pub fn build_duck_filter(narration_dur: f64, clip_dur: f64) -> String {
    if narration_dur + 0.05 >= clip_dur {
        return "[0:a]volume=0[abase];\
                [abase][1:a]amix=inputs=2:duration=first:dropout_transition=2[aout]"
            .to_string();
    }

    format!(
        "[0:a]atrim=0:{d:.3},asetpts=PTS-STARTPTS,volume=0[amute];\
         [0:a]atrim={d:.3},asetpts=PTS-STARTPTS[atail];\
         [amute][atail]concat=n=2:v=0:a=1[abase];\
         [abase][1:a]amix=inputs=2:duration=first:dropout_transition=2[aout]",
        d = narration_dur,
    )
}

/// Overlays narration audio on the clip with the original track ducked
/// underneath it. Video is passed through untouched.
pub async fn ffmpeg_layer_narration(
    input: &Path,
    narration_mp3: &Path,
    out_mp4: &Path,
) -> Result<bool> {
    let clip_dur = ffprobe_duration_seconds(input).await?;
    let narration_dur = ffprobe_duration_seconds(narration_mp3).await?;

    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-i".to_string(),
        narration_mp3.display().to_string(),
        "-filter_complex".to_string(),
        build_duck_filter(narration_dur, clip_dur),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ];

    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pane_filter_targets_canvas_resolution() {
        let filter = build_single_pane_filter();
        assert!(filter.contains("scale=1080:1920:force_original_aspect_ratio=decrease"));
        assert!(filter.contains("pad=1080:1920:(ow-iw)/2:(oh-ih)/2:black"));
    }

    #[test]
    fn narrow_filler_is_scaled_up_to_canvas_width() {
        let (w, h, y) = filler_crop_geometry(540, 960);
        assert_eq!(w, 1080);
        assert_eq!(h, 1920);
        // 1920 - 960 - floor(0.15 * 1920) = 672
        assert_eq!(y, 672);
    }

    #[test]
    fn short_filler_crops_from_the_top() {
        // Scaled height below pane height plus margin clamps to zero.
        let (_, h, y) = filler_crop_geometry(1920, 1080);
        assert_eq!(h, 1080);
        assert_eq!(y, 0);
    }

    #[test]
    fn dual_pane_filter_stacks_both_panes() {
        let filter = build_dual_pane_filter(1080, 1920, 24.5);
        assert!(filter.contains("crop=1080:960,setsar=1[main]"));
        assert!(filter.contains("trim=duration=24.500"));
        assert!(filter.contains("crop=1080:960:0:672"));
        assert!(filter.contains("overlay=0:960:eof_action=pass[v]"));
        assert!(filter.contains("color=c=black:size=1080x1920"));
    }

    #[test]
    fn duck_filter_mutes_exactly_the_narration_span() {
        let filter = build_duck_filter(3.2, 30.0);
        assert!(filter.contains("atrim=0:3.200,asetpts=PTS-STARTPTS,volume=0[amute]"));
        assert!(filter.contains("[0:a]atrim=3.200,asetpts=PTS-STARTPTS[atail]"));
        assert!(filter.contains("concat=n=2:v=0:a=1[abase]"));
        assert!(filter.contains("amix=inputs=2:duration=first"));
    }

    #[test]
    fn duck_filter_mutes_everything_when_narration_outlasts_clip() {
        let filter = build_duck_filter(31.0, 30.0);
        assert!(filter.starts_with("[0:a]volume=0[abase]"));
        assert!(!filter.contains("concat"));
    }
}
