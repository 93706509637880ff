use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod groq;
pub mod tiktok_tts;

/// Voice ids grouped by category, as served by the voice catalog.
pub type VoiceCatalog = BTreeMap<String, Vec<String>>;

/// A text completion backend.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// A text-to-speech backend returning one decoded audio segment per request.
#[async_trait]
pub trait SpeechApi: Send + Sync {
    async fn generate(&self, text: &str, voice: &str) -> Result<Vec<u8>>;

    async fn voices(&self) -> Result<VoiceCatalog>;
}
