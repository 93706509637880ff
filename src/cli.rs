use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use story_shorts::api::SpeechApi;
use story_shorts::api::tiktok_tts::TikTokTts;
use story_shorts::config::{Config, DEFAULT_PROFILE};
use story_shorts::generator::run_generation;
use story_shorts::init;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "story-shorts", about = "Turn a story into a narrated vertical short")]
struct Args {
    /// Path to config.json
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate title, summary, narration, title card and video for a story
    Generate {
        /// Read the story from this file (stdin when neither this nor --story is given)
        #[arg(long, conflicts_with = "story")]
        story_file: Option<PathBuf>,

        /// Story text
        #[arg(long)]
        story: Option<String>,

        /// Language model profile
        #[arg(long, default_value = DEFAULT_PROFILE)]
        profile: String,

        /// TTS voice id, overrides config
        #[arg(long)]
        voice: Option<String>,

        /// Resolve relative output and asset paths under this directory
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },
    /// List voices offered by the TTS endpoint
    Voices,
}

async fn read_story(story_file: Option<PathBuf>, story: Option<String>) -> Result<String> {
    if let Some(text) = story {
        return Ok(text);
    }
    if let Some(path) = story_file {
        return tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read story: {}", path.display()));
    }

    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read story from stdin")?;
    Ok(text)
}

async fn list_voices(cfg: &Config) -> Result<i32> {
    let tts = TikTokTts::new(reqwest::Client::new(), &cfg.tts);
    let voices = tts.voices().await?;
    println!("Available voices:");
    for (category, list) in &voices {
        println!("\n{}:", category);
        for voice in list {
            println!("  - {}", voice);
        }
    }
    Ok(0)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config).await?;

    let code = match args.command {
        Command::Voices => list_voices(&cfg).await?,
        Command::Generate {
            story_file,
            story,
            profile,
            voice,
            base_dir,
        } => {
            if let Some(voice) = voice {
                cfg.tts.voice = voice;
            }
            let story = read_story(story_file, story).await?;

            let paths = match &base_dir {
                Some(base) => cfg.paths.rooted_at(base),
                None => cfg.paths.clone(),
            };
            init::ensure_directories(&paths).await?;
            if !init::check_ffmpeg().await {
                tracing::warn!("FFmpeg not found in PATH. Video generation will fail.");
            }

            let run = run_generation(&cfg, &profile, &story, base_dir.as_deref()).await?;

            if let Some(title) = &run.title {
                println!("Title: {}", title.trim());
            }
            if let Some(summary) = &run.summary {
                println!("Summary: {}", summary.trim());
            }
            for artifact in &run.artifacts {
                println!("Generated {}", artifact);
            }
            for failure in &run.failures {
                println!("Failed {} ({}): {}", failure.stage, failure.error.kind(), failure.error);
            }

            if run.succeeded() { 0 } else { 1 }
        }
    };

    std::process::exit(code);
}
