use crate::config::OutputPaths;
use crate::{logi, logw};
use anyhow::Result;
use tokio::fs;

/// Creates the parent directory of every configured output.
pub async fn ensure_directories(paths: &OutputPaths) -> Result<()> {
    for path in paths.generated() {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !fs::try_exists(dir).await.unwrap_or(false) {
                fs::create_dir_all(dir).await?;
                logi(format!("Created directory: {}", dir.display()));
            }
        }
    }

    for input in [&paths.image_template, &paths.video_template] {
        if !input.is_file() {
            logw(format!("Input asset not found: {}", input.display()));
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn creates_output_parents() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::default().rooted_at(dir.path());

        ensure_directories(&paths).await.unwrap();

        assert!(dir.path().join("output").is_dir());
        assert!(!Path::new(&paths.audio).exists());
    }
}
