use crate::api::{SpeechApi, VoiceCatalog};
use crate::config::TtsSettings;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    data: Option<String>,
    error: Option<String>,
}

/// Decodes the `{ "data": "<base64>" }` body returned per chunk.
fn decode_generation(raw: &str) -> Result<Vec<u8>> {
    let resp: GenerationResponse = serde_json::from_str(raw)
        .map_err(|e| PipelineError::Network(format!("malformed TTS body: {e}")))?;

    let data = match (resp.data, resp.error) {
        (Some(data), _) if !data.is_empty() => data,
        (_, Some(err)) => return Err(PipelineError::Network(format!("TTS error: {err}"))),
        _ => return Err(PipelineError::Network("TTS body had no audio data".to_string())),
    };

    STANDARD
        .decode(data.trim())
        .map_err(|e| PipelineError::Network(format!("invalid base64 audio: {e}")))
}

fn parse_voices(raw: &str) -> Result<VoiceCatalog> {
    serde_json::from_str(raw)
        .map_err(|e| PipelineError::Network(format!("malformed voice catalog: {e}")))
}

/// Client for the public TikTok TTS proxy.
pub struct TikTokTts {
    client: Client,
    generation_url: String,
    voices_url: String,
    timeout: Duration,
}

impl TikTokTts {
    pub fn new(client: Client, settings: &TtsSettings) -> Self {
        Self {
            client,
            generation_url: settings.generation_url.clone(),
            voices_url: settings.voices_url.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[async_trait]
impl SpeechApi for TikTokTts {
    async fn generate(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "text": text,
            "voice": voice,
        });

        let resp = self
            .client
            .post(&self.generation_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("TTS request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Network(format!(
                "TTS failed HTTP {}",
                status.as_u16()
            )));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| PipelineError::Network(format!("TTS response read failed: {e}")))?;
        decode_generation(&raw)
    }

    async fn voices(&self) -> Result<VoiceCatalog> {
        let resp = self
            .client
            .get(&self.voices_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("voice catalog request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Network(format!(
                "voice catalog HTTP {}",
                status.as_u16()
            )));
        }

        let raw = resp
            .text()
            .await
            .map_err(|e| PipelineError::Network(format!("voice catalog read failed: {e}")))?;
        parse_voices(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_payload() {
        let raw = format!(r#"{{"success":true,"data":"{}"}}"#, STANDARD.encode(b"ID3\x04frames"));
        assert_eq!(decode_generation(&raw).unwrap(), b"ID3\x04frames");
    }

    #[test]
    fn missing_data_is_a_network_error() {
        let err = decode_generation(r#"{"success":false,"error":"Text too long"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::Network(ref m) if m.contains("Text too long")));
        assert!(decode_generation(r#"{"success":true,"data":""}"#).is_err());
        assert!(decode_generation("<html>busy</html>").is_err());
    }

    #[test]
    fn bad_base64_is_rejected() {
        assert!(matches!(
            decode_generation(r#"{"data":"***not base64***"}"#),
            Err(PipelineError::Network(_))
        ));
    }

    #[test]
    fn parses_voice_catalog() {
        let catalog =
            parse_voices(r#"{"English US":["en_us_001","en_us_002"],"Disney":["en_us_ghostface"]}"#)
                .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog["English US"], vec!["en_us_001", "en_us_002"]);
    }
}
