use crate::error::{PipelineError, Result};
use crate::ffmpeg;
use crate::{logi, logok};
use std::io::Write;
use std::path::Path;
use tokio::fs;

/// How many copies of the background clip cover the narration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopPlan {
    pub loop_count: u32,
    /// Length of the concatenated copies before truncation.
    pub covered: f64,
    /// Final length, always the audio length.
    pub duration: f64,
}

impl LoopPlan {
    pub fn new(audio_s: f64, video_s: f64) -> Result<Self> {
        if !(audio_s > 0.0 && video_s > 0.0) {
            return Err(PipelineError::Media(format!(
                "cannot loop {video_s:.3}s clip over {audio_s:.3}s audio"
            )));
        }
        let loop_count = (audio_s / video_s).floor() as u32 + 1;
        let covered = loop_count as f64 * video_s;
        Ok(Self {
            loop_count,
            covered,
            duration: covered.min(audio_s),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoReport {
    pub loop_count: u32,
    pub duration: f64,
}

fn require(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingAsset(path.to_path_buf()))
    }
}

/// Loops `template` under `image` for the length of `audio` and renders `output`.
pub async fn compose(
    template: &Path,
    audio: &Path,
    image: &Path,
    output: &Path,
) -> Result<VideoReport> {
    require(template)?;
    require(audio)?;
    require(image)?;

    let video_s = ffmpeg::ffprobe_duration_seconds(template).await?;
    let audio_s = ffmpeg::ffprobe_duration_seconds(audio).await?;
    let plan = LoopPlan::new(audio_s, video_s)?;
    logi(format!(
        "Looping {} x{} ({:.2}s each) to cover {:.2}s of narration",
        template.display(),
        plan.loop_count,
        video_s,
        audio_s
    ));

    let template = fs::canonicalize(template).await?;
    let mut list = tempfile::Builder::new()
        .prefix("story_shorts_concat_")
        .suffix(".txt")
        .tempfile()?;
    list.write_all(ffmpeg::concat_list(&template, plan.loop_count).as_bytes())?;
    list.flush()?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await?;
    }

    if !ffmpeg::ffmpeg_loop_overlay(list.path(), image, audio, plan.duration, output).await? {
        return Err(PipelineError::Media(format!(
            "ffmpeg produced no file at {}",
            output.display()
        )));
    }

    logok(format!("Video written: {} ({:.2}s)", output.display(), plan.duration));
    Ok(VideoReport {
        loop_count: plan.loop_count,
        duration: plan.duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_count_covers_audio() {
        let plan = LoopPlan::new(125.0, 50.0).unwrap();
        assert_eq!(plan.loop_count, 3);
        assert_eq!(plan.covered, 150.0);
        assert_eq!(plan.duration, 125.0);
    }

    #[test]
    fn exact_multiple_still_adds_a_loop() {
        let plan = LoopPlan::new(100.0, 50.0).unwrap();
        assert_eq!(plan.loop_count, 3);
        assert_eq!(plan.duration, 100.0);
    }

    #[test]
    fn short_audio_uses_one_copy() {
        let plan = LoopPlan::new(12.5, 50.0).unwrap();
        assert_eq!(plan.loop_count, 1);
        assert_eq!(plan.duration, 12.5);
    }

    #[test]
    fn zero_length_inputs_are_rejected() {
        assert!(LoopPlan::new(0.0, 50.0).is_err());
        assert!(LoopPlan::new(10.0, 0.0).is_err());
        assert!(LoopPlan::new(f64::NAN, 1.0).is_err());
    }

    #[tokio::test]
    async fn missing_template_fails_before_probing() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("output.mp3");
        let image = dir.path().join("card.png");
        std::fs::write(&audio, b"ID3").unwrap();
        std::fs::write(&image, b"png").unwrap();

        let err = compose(
            &dir.path().join("background.mp4"),
            &audio,
            &image,
            &dir.path().join("out.mp4"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingAsset(ref p) if p.ends_with("background.mp4")));
    }

    #[tokio::test]
    async fn missing_audio_is_a_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("background.mp4");
        std::fs::write(&template, b"mp4").unwrap();

        let err = compose(
            &template,
            &dir.path().join("output.mp3"),
            &dir.path().join("card.png"),
            &dir.path().join("out.mp4"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingAsset(ref p) if p.ends_with("output.mp3")));
    }
}
