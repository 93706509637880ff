use crate::api::groq::GroqClient;
use crate::api::tiktok_tts::TikTokTts;
use crate::config::{Config, OutputPaths, OverlayLayout};
use crate::error::{PipelineError, Result};
use crate::fonts::FontSet;
use crate::speech::Narrator;
use crate::story::StoryWriter;
use crate::{logi, logok, logw, overlay, video};
use anyhow::Context;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

/// A file produced by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Artifact {
    Audio,
    Image,
    Video,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Artifact::Audio => "audio",
            Artifact::Image => "image",
            Artifact::Video => "video",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    TitleSummary,
    Audio,
    Image,
    Video,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::TitleSummary => "title/summary",
            Stage::Audio => "audio",
            Stage::Image => "image",
            Stage::Video => "video",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    TitleSummaryGenerating,
    AudioGenerating,
    ImageGenerating,
    VideoGenerating,
    Done,
}

impl RunState {
    pub fn next(self) -> Self {
        match self {
            RunState::Idle => RunState::TitleSummaryGenerating,
            RunState::TitleSummaryGenerating => RunState::AudioGenerating,
            RunState::AudioGenerating => RunState::ImageGenerating,
            RunState::ImageGenerating => RunState::VideoGenerating,
            RunState::VideoGenerating | RunState::Done => RunState::Done,
        }
    }
}

#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: PipelineError,
}

/// Everything one story submission produced.
#[derive(Debug)]
pub struct GenerationRun {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub artifacts: BTreeSet<Artifact>,
    pub failures: Vec<StageFailure>,
    state: RunState,
}

impl GenerationRun {
    fn new() -> Self {
        Self {
            title: None,
            summary: None,
            artifacts: BTreeSet::new(),
            failures: Vec::new(),
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// True when at least one artifact was written.
    pub fn succeeded(&self) -> bool {
        !self.artifacts.is_empty()
    }

    pub fn has(&self, artifact: Artifact) -> bool {
        self.artifacts.contains(&artifact)
    }

    fn advance(&mut self) {
        self.state = self.state.next();
    }

    fn fail(&mut self, stage: Stage, error: PipelineError) {
        logw(format!("{} stage failed: {}", stage, error));
        self.failures.push(StageFailure { stage, error });
    }

    fn record<T>(&mut self, stage: Stage, artifact: Artifact, outcome: Result<T>) {
        match outcome {
            Ok(_) => {
                self.artifacts.insert(artifact);
            }
            Err(err) => self.fail(stage, err),
        }
    }
}

/// Runs the four stages for a story, one after another.
pub struct Generator {
    writer: StoryWriter,
    narrator: Narrator,
    fonts: FontSet,
    layout: OverlayLayout,
    paths: OutputPaths,
}

impl Generator {
    pub fn new(
        writer: StoryWriter,
        narrator: Narrator,
        fonts: FontSet,
        layout: OverlayLayout,
        paths: OutputPaths,
    ) -> Self {
        Self {
            writer,
            narrator,
            fonts,
            layout,
            paths,
        }
    }

    /// Wires the Groq and TikTok clients from `cfg`.
    ///
    /// Fails with `Configuration` if `profile` does not resolve.
    pub fn from_config(cfg: &Config, profile: &str, client: reqwest::Client) -> Result<Self> {
        let profile = cfg.llm_profile(profile)?;
        let llm = GroqClient::new(
            client.clone(),
            cfg.llm_url.clone(),
            profile,
            Duration::from_secs(cfg.llm_timeout_secs),
        );
        logi(format!("Language model: {}", llm.model()));

        let writer = StoryWriter::new(Arc::new(llm));
        let tts = TikTokTts::new(client, &cfg.tts);
        let narrator = Narrator::new(
            writer.clone(),
            Arc::new(tts),
            cfg.tts.voice.clone(),
            cfg.tts.max_chunk_chars,
        );
        let fonts = FontSet::discover(
            &cfg.font_candidates,
            cfg.overlay.regular_size,
            cfg.overlay.bold_size,
        );

        Ok(Self::new(
            writer,
            narrator,
            fonts,
            cfg.overlay.clone(),
            cfg.paths.clone(),
        ))
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Deletes the previous run's files. A path that cannot be cleared fails
    /// the stage that writes it, and that stage is skipped.
    async fn clear_previous_outputs(&self, run: &mut GenerationRun) -> Vec<Stage> {
        let mut blocked = Vec::new();
        let owners = [Stage::Audio, Stage::Image, Stage::Video];
        for (stage, path) in owners.into_iter().zip(self.paths.generated()) {
            match fs::remove_file(path).await {
                Ok(()) => logi(format!("Removed previous output {}", path.display())),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    logw(format!("Could not clear {}", path.display()));
                    run.fail(stage, err.into());
                    blocked.push(stage);
                }
            }
        }
        blocked
    }

    async fn title_and_summary(&self, story: &str, run: &mut GenerationRun) {
        match self.writer.title(story).await {
            Ok(title) => run.title = Some(title),
            Err(err) => run.fail(Stage::TitleSummary, err),
        }
        match self.writer.summary(story).await {
            Ok(summary) => run.summary = Some(summary),
            Err(err) => run.fail(Stage::TitleSummary, err),
        }
    }

    fn image(&self, run: &GenerationRun) -> Result<overlay::OverlayReport> {
        let title = run
            .title
            .as_deref()
            .ok_or(PipelineError::MissingInput("title"))?;
        let summary = run
            .summary
            .as_deref()
            .ok_or(PipelineError::MissingInput("summary"))?;
        overlay::compose(
            &self.paths.image_template,
            &self.paths.image,
            title,
            summary,
            &self.fonts,
            &self.layout,
        )
    }

    async fn video(&self, run: &GenerationRun) -> Result<video::VideoReport> {
        if !run.has(Artifact::Audio) {
            return Err(PipelineError::MissingInput("audio"));
        }
        if !run.has(Artifact::Image) {
            return Err(PipelineError::MissingInput("image"));
        }
        video::compose(
            &self.paths.video_template,
            &self.paths.audio,
            &self.paths.image,
            &self.paths.video,
        )
        .await
    }

    /// Attempts every stage for `story` and reports what was produced.
    ///
    /// Only an empty story aborts the run. Stage failures are recorded and the
    /// next stage still runs; video needs both the audio and the image.
    pub async fn run(&self, story: &str) -> Result<GenerationRun> {
        let story = story.trim();
        if story.is_empty() {
            return Err(PipelineError::EmptyStory);
        }

        let mut run = GenerationRun::new();
        let blocked = self.clear_previous_outputs(&mut run).await;

        run.advance();
        logi("Generating story elements...");
        self.title_and_summary(story, &mut run).await;

        run.advance();
        if !blocked.contains(&Stage::Audio) {
            logi("Generating audio...");
            let audio = self.narrator.generate(story, &self.paths.audio).await;
            run.record(Stage::Audio, Artifact::Audio, audio);
        }

        run.advance();
        if !blocked.contains(&Stage::Image) {
            logi("Generating image...");
            let image = self.image(&run);
            run.record(Stage::Image, Artifact::Image, image);
        }

        run.advance();
        if !blocked.contains(&Stage::Video) {
            logi("Generating video...");
            let video = self.video(&run).await;
            run.record(Stage::Video, Artifact::Video, video);
        }

        run.advance();
        if run.succeeded() {
            let produced: Vec<String> = run.artifacts.iter().map(|a| a.to_string()).collect();
            logok(format!("Generated: {}", produced.join(", ")));
        } else {
            logw("Failed to generate any content.");
        }
        Ok(run)
    }
}

/// Loads config, builds the clients and runs one story.
pub async fn run_generation(
    cfg: &Config,
    profile: &str,
    story: &str,
    base: Option<&Path>,
) -> anyhow::Result<GenerationRun> {
    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let mut cfg = cfg.clone();
    if let Some(base) = base {
        cfg.paths = cfg.paths.rooted_at(base);
    }

    let generator = Generator::from_config(&cfg, profile, client)?;
    Ok(generator.run(story).await?)
}
