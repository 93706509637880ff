use crate::error::{PipelineError, Result};
use std::path::Path;
use tokio::process::Command;

/// Last few hundred chars of a tool's stderr, where ffmpeg puts the actual error.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(600);
    text.chars().skip(skip).collect()
}

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| PipelineError::Media(format!("{} execution failed: {}", args[0], e)))?;
    if !output.status.success() {
        return Err(PipelineError::Media(format!(
            "Command failed ({}): {:?}: {}",
            output.status,
            args,
            stderr_tail(&output.stderr)
        )));
    }

    Ok(())
}

fn parse_duration(text: &str) -> Option<f64> {
    let duration = text.trim().parse::<f64>().ok()?;
    (duration > 0.1 && duration.is_finite()).then_some(duration)
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
        .map_err(|e| PipelineError::Media(format!("ffprobe execution failed: {e}")))?;

    if !output.status.success() {
        return Err(PipelineError::Media(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            stderr_tail(&output.stderr)
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_duration(&text).ok_or_else(|| {
        PipelineError::Media(format!("Invalid duration for {}: {:?}", path.display(), text.trim()))
    })
}

/// Concat demuxer list naming `clip` `loops` times.
pub fn concat_list(clip: &Path, loops: u32) -> String {
    let escaped = clip.display().to_string().replace('\'', "'\\''");
    let mut out = String::new();
    for _ in 0..loops {
        out.push_str(&format!("file '{}'\n", escaped));
    }
    out
}

/// Arguments for the final render: looped background, centred image, narration.
pub fn loop_overlay_args(
    list_txt: &Path,
    image: &Path,
    audio: &Path,
    duration_s: f64,
    out_mp4: &Path,
) -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        image.display().to_string(),
        "-i".to_string(),
        audio.display().to_string(),
        "-filter_complex".to_string(),
        "[0:v][1:v]overlay=(W-w)/2:(H-h)/2:shortest=1[v]".to_string(),
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "2:a".to_string(),
        "-t".to_string(),
        format!("{:.3}", duration_s),
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
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ]
}

pub async fn ffmpeg_loop_overlay(
    list_txt: &Path,
    image: &Path,
    audio: &Path,
    duration_s: f64,
    out_mp4: &Path,
) -> Result<bool> {
    run_cmd(&loop_overlay_args(list_txt, image, audio, duration_s, out_mp4)).await?;
    Ok(out_mp4.exists())
}
