use crate::api::Completion;
use crate::config::LlmProfile;
use crate::error::{PipelineError, Result};
use crate::logw;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

fn body_snippet(raw: &str) -> String {
    raw.chars().take(800).collect()
}

/// Chat request carrying the whole prompt; oversize prompts are the endpoint's call.
fn request_body(model: &str, prompt: &str) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [
            {"role": "user", "content": prompt},
        ],
    })
}

/// Pulls `choices[0].message.content` out of a chat completion body.
fn extract_message_content(resp_json: &str) -> Result<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json)
        .map_err(|e| PipelineError::Upstream(format!("malformed completion body: {e}")))?;

    if let Some(err) = root.get("error") {
        let msg = err
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        if let Some(typ) = err.get("type").and_then(|v| v.as_str()) {
            logw(format!("Groq error type: {}", typ));
        }
        if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
            logw(format!("Groq error code: {}", code));
        }
        return Err(PipelineError::Upstream(msg.to_string()));
    }

    let content = root
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| PipelineError::Upstream("completion had no message content".to_string()))?;

    if content.trim().is_empty() {
        return Err(PipelineError::Upstream("completion was empty".to_string()));
    }
    Ok(content.to_string())
}

/// Chat completion client for Groq's OpenAI-compatible endpoint.
pub struct GroqClient {
    client: Client,
    profile: LlmProfile,
    url: String,
    timeout: Duration,
}

impl GroqClient {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        profile: LlmProfile,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            profile,
            url: url.into(),
            timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.profile.model
    }
}

#[async_trait]
impl Completion for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = request_body(&self.profile.model, prompt);

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.profile.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Upstream(format!("Groq request failed: {e}")))?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            logw(format!("Groq HTTP {}", status.as_u16()));
            if !raw.is_empty() {
                logw(format!("Groq raw body: {}", body_snippet(&raw)));
            }
            return Err(match extract_message_content(&raw) {
                Err(err) => err,
                Ok(_) => PipelineError::Upstream(format!("HTTP {}", status.as_u16())),
            });
        }

        extract_message_content(&raw).inspect_err(|_| {
            logw("Groq response parse failed.");
            if !raw.is_empty() {
                logw(format!("Groq raw body: {}", body_snippet(&raw)));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"choices":[{"index":0,
            "message":{"role":"assistant","content":"The Knock"}}]}"#;
        assert_eq!(extract_message_content(body).unwrap(), "The Knock");
    }

    #[test]
    fn error_object_is_upstream() {
        let body = r#"{"error":{"message":"Invalid API Key",
            "type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let err = extract_message_content(body).unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(ref m) if m == "Invalid API Key"));
    }

    #[test]
    fn missing_content_is_upstream() {
        assert!(matches!(
            extract_message_content(r#"{"choices":[]}"#),
            Err(PipelineError::Upstream(_))
        ));
        assert!(matches!(
            extract_message_content("not json"),
            Err(PipelineError::Upstream(_))
        ));
    }

    #[test]
    fn blank_content_is_upstream() {
        let body = r#"{"choices":[{"message":{"content":"  \n"}}]}"#;
        assert!(extract_message_content(body).is_err());
    }

    #[test]
    fn long_stories_are_sent_whole() {
        let story = format!("{} THE ENDING", "word ".repeat(30_000));
        assert!(story.len() > 150_000);

        let body = request_body("llama-3.1-70b-versatile", &story);
        let sent = body["messages"][0]["content"].as_str().unwrap();
        assert_eq!(sent.len(), story.len());
        assert!(sent.ends_with("THE ENDING"));
        assert_eq!(body["model"], "llama-3.1-70b-versatile");
    }
}
