use crate::api::SpeechApi;
use crate::chunker;
use crate::error::{PipelineError, Result};
use crate::story::StoryWriter;
use crate::{logi, logok, logw};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioReport {
    pub chunks_total: usize,
    pub chunks_ok: usize,
    pub bytes: usize,
}

/// Turns a story into one narration track.
///
/// The story is rewritten as narration, split into word-aligned chunks and
/// each chunk is synthesized separately. Segments are joined byte for byte,
/// so the endpoint must return a concatenable stream (MPEG frames).
pub struct Narrator {
    writer: StoryWriter,
    tts: Arc<dyn SpeechApi>,
    voice: String,
    max_chunk_chars: usize,
}

impl Narrator {
    pub fn new(
        writer: StoryWriter,
        tts: Arc<dyn SpeechApi>,
        voice: impl Into<String>,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            writer,
            tts,
            voice: voice.into(),
            max_chunk_chars,
        }
    }

    /// Synthesizes every chunk of `text`, skipping the ones that fail.
    pub async fn speak(&self, text: &str) -> Result<(Vec<u8>, AudioReport)> {
        let chunks = chunker::split(text, self.max_chunk_chars);
        let total = chunks.len();

        let mut audio = Vec::new();
        let mut ok = 0usize;
        for (idx, chunk) in chunks.iter().enumerate() {
            logi(format!("Processing chunk {}/{}", idx + 1, total));
            match self.tts.generate(chunk, &self.voice).await {
                Ok(segment) => {
                    audio.extend_from_slice(&segment);
                    ok += 1;
                }
                Err(err) => logw(format!("Chunk {}/{} failed: {}", idx + 1, total, err)),
            }
        }

        if ok == 0 {
            return Err(PipelineError::AudioGeneration { chunks: total });
        }

        let report = AudioReport {
            chunks_total: total,
            chunks_ok: ok,
            bytes: audio.len(),
        };
        Ok((audio, report))
    }

    /// Narration text for `story`, synthesized into raw audio bytes.
    pub async fn synthesize(&self, story: &str) -> Result<(Vec<u8>, AudioReport)> {
        let narration = self.writer.narration(story).await?;
        self.speak(&narration).await
    }

    /// Synthesizes `story` and writes the audio to `out_path`.
    pub async fn generate(&self, story: &str, out_path: &Path) -> Result<AudioReport> {
        let (audio, report) = self.synthesize(story).await?;

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(out_path, &audio).await?;

        logok(format!(
            "Audio written: {} ({}/{} chunks, {} bytes)",
            out_path.display(),
            report.chunks_ok,
            report.chunks_total,
            report.bytes
        ));
        Ok(report)
    }
}
