use crate::error::PipelineError;
use crate::logi;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const GROQ_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "groq_api_key")]
    #[serde(default)]
    pub groq_key: String,
    #[serde(rename = "groq_model")]
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(rename = "groq_url")]
    #[serde(default = "default_llm_url")]
    pub llm_url: String,
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,
    #[serde(default)]
    pub profiles: BTreeMap<String, LlmProfile>,
    #[serde(default)]
    pub tts: TtsSettings,
    #[serde(default)]
    pub overlay: OverlayLayout,
    #[serde(default = "default_font_candidates")]
    pub font_candidates: Vec<PathBuf>,
    #[serde(default)]
    pub paths: OutputPaths,
}

/// Credential and model for one completion backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmProfile {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    #[serde(default = "default_tts_url")]
    pub generation_url: String,
    #[serde(default = "default_voices_url")]
    pub voices_url: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

/// Fixed positions and sizes for the title card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayLayout {
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    #[serde(default = "default_header")]
    pub header: String,
    #[serde(default = "default_header_pos")]
    pub header_pos: (i32, i32),
    #[serde(default = "default_title_pos")]
    pub title_pos: (i32, i32),
    #[serde(default = "default_summary_pos")]
    pub summary_pos: (i32, i32),
    #[serde(default = "default_side_margin")]
    pub side_margin: u32,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: u32,
    #[serde(default = "default_regular_size")]
    pub regular_size: f32,
    #[serde(default = "default_bold_size")]
    pub bold_size: f32,
    #[serde(default = "default_text_color")]
    pub text_color: [u8; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPaths {
    #[serde(default = "default_audio_path")]
    pub audio: PathBuf,
    #[serde(default = "default_image_path")]
    pub image: PathBuf,
    #[serde(default = "default_video_path")]
    pub video: PathBuf,
    #[serde(default = "default_image_template")]
    pub image_template: PathBuf,
    #[serde(default = "default_video_template")]
    pub video_template: PathBuf,
}

fn default_model() -> String {
    "llama-3.1-70b-versatile".to_string()
}

fn default_llm_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_tts_url() -> String {
    "https://tiktok-tts.weilnet.workers.dev/api/generation".to_string()
}

fn default_voices_url() -> String {
    "https://tiktok-tts.weilnet.workers.dev/api/voices".to_string()
}

fn default_voice() -> String {
    "en_us_002".to_string()
}

fn default_max_chunk_chars() -> usize {
    300
}

fn default_tts_timeout() -> u64 {
    10
}

fn default_target_width() -> u32 {
    600
}

fn default_header() -> String {
    "Scary stories".to_string()
}

fn default_header_pos() -> (i32, i32) {
    (50, 10)
}

fn default_title_pos() -> (i32, i32) {
    (10, 40)
}

fn default_summary_pos() -> (i32, i32) {
    (10, 80)
}

fn default_side_margin() -> u32 {
    20
}

fn default_line_spacing() -> u32 {
    5
}

fn default_regular_size() -> f32 {
    18.0
}

fn default_bold_size() -> f32 {
    24.0
}

fn default_text_color() -> [u8; 4] {
    [255, 255, 255, 255]
}

fn default_font_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
        PathBuf::from("/usr/share/fonts/TTF/DejaVuSans.ttf"),
        PathBuf::from("assets/DejaVuSans.ttf"),
    ]
}

fn default_audio_path() -> PathBuf {
    PathBuf::from("output/output.mp3")
}

fn default_image_path() -> PathBuf {
    PathBuf::from("output/E-template.png")
}

fn default_video_path() -> PathBuf {
    PathBuf::from("output/output_video.mp4")
}

fn default_image_template() -> PathBuf {
    PathBuf::from("assets/template.png")
}

fn default_video_template() -> PathBuf {
    PathBuf::from("assets/background.mp4")
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            generation_url: default_tts_url(),
            voices_url: default_voices_url(),
            voice: default_voice(),
            max_chunk_chars: default_max_chunk_chars(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

impl Default for OverlayLayout {
    fn default() -> Self {
        Self {
            target_width: default_target_width(),
            header: default_header(),
            header_pos: default_header_pos(),
            title_pos: default_title_pos(),
            summary_pos: default_summary_pos(),
            side_margin: default_side_margin(),
            line_spacing: default_line_spacing(),
            regular_size: default_regular_size(),
            bold_size: default_bold_size(),
            text_color: default_text_color(),
        }
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            audio: default_audio_path(),
            image: default_image_path(),
            video: default_video_path(),
            image_template: default_image_template(),
            video_template: default_video_template(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            groq_key: String::new(),
            model: default_model(),
            llm_url: default_llm_url(),
            llm_timeout_secs: default_llm_timeout(),
            profiles: BTreeMap::new(),
            tts: TtsSettings::default(),
            overlay: OverlayLayout::default(),
            font_candidates: default_font_candidates(),
            paths: OutputPaths::default(),
        }
    }
}

impl OutputPaths {
    /// Re-roots every relative path under `base`.
    pub fn rooted_at(&self, base: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { base.join(p) };
        Self {
            audio: join(&self.audio),
            image: join(&self.image),
            video: join(&self.video),
            image_template: join(&self.image_template),
            video_template: join(&self.video_template),
        }
    }

    /// Paths this crate writes during a run.
    pub fn generated(&self) -> [&Path; 3] {
        [&self.audio, &self.image, &self.video]
    }
}

impl Config {
    /// Reads `path` if it exists (defaults otherwise) and applies `GROQ_API_KEY`.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if fs::try_exists(path).await.unwrap_or(false) {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Self::from_json(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            logi(format!("No config at {}; using defaults", path.display()));
            Self::default()
        };

        if let Ok(key) = std::env::var(GROQ_KEY_ENV) {
            if !key.trim().is_empty() {
                config.groq_key = key;
            }
        }

        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        if config.tts.voice.trim().is_empty() {
            anyhow::bail!("config.json: tts.voice is empty");
        }
        if config.overlay.target_width == 0 {
            anyhow::bail!("config.json: overlay.target_width must be positive");
        }
        Ok(config)
    }

    /// Resolves a named completion profile.
    ///
    /// `default` is built from the top-level key and model; any other name
    /// must be listed under `profiles`.
    pub fn llm_profile(&self, name: &str) -> Result<LlmProfile, PipelineError> {
        let profile = match self.profiles.get(name) {
            Some(profile) => profile.clone(),
            None if name == DEFAULT_PROFILE => LlmProfile {
                api_key: self.groq_key.clone(),
                model: self.model.clone(),
            },
            None => {
                return Err(PipelineError::Configuration(format!(
                    "Configuration '{name}' not found"
                )));
            }
        };

        if profile.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "profile '{name}' has no API key (set {GROQ_KEY_ENV} or groq_api_key)"
            )));
        }
        Ok(profile)
    }
}
