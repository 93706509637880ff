use crate::api::Completion;
use crate::error::Result;
use std::sync::Arc;

pub const TITLE_PROMPT: &str = "Create a title for this story with 4 words maximum:\n\n";
pub const SUMMARY_PROMPT: &str = "Create a summary for this story in 3 phrases maximum, \
     it should be creative to get people's attention:\n\n";
pub const NARRATION_PROMPT: &str = "The following story is for a tiktok video, re-create it \
     like it happened to you in a 1 minute video, make it interesting as a story to hear:\n\n";

/// Derives the title, summary and narration script for a story.
///
/// Length targets live only in the prompts; nothing here checks the output.
#[derive(Clone)]
pub struct StoryWriter {
    llm: Arc<dyn Completion>,
}

impl StoryWriter {
    pub fn new(llm: Arc<dyn Completion>) -> Self {
        Self { llm }
    }

    pub async fn title(&self, story: &str) -> Result<String> {
        self.llm.complete(&format!("{TITLE_PROMPT}{story}")).await
    }

    pub async fn summary(&self, story: &str) -> Result<String> {
        self.llm.complete(&format!("{SUMMARY_PROMPT}{story}")).await
    }

    pub async fn narration(&self, story: &str) -> Result<String> {
        self.llm.complete(&format!("{NARRATION_PROMPT}{story}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Completion for Recorder {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("ok".to_string())
        }
    }

    struct Down;

    #[async_trait]
    impl Completion for Down {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(PipelineError::Upstream("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn prompts_prefix_the_story() {
        let recorder = Arc::new(Recorder::default());
        let writer = StoryWriter::new(recorder.clone());

        writer.title("the story").await.unwrap();
        writer.summary("the story").await.unwrap();
        writer.narration("the story").await.unwrap();

        let prompts = recorder.prompts.lock().unwrap();
        assert_eq!(prompts[0], format!("{TITLE_PROMPT}the story"));
        assert_eq!(prompts[1], format!("{SUMMARY_PROMPT}the story"));
        assert_eq!(prompts[2], format!("{NARRATION_PROMPT}the story"));
    }

    #[tokio::test]
    async fn upstream_errors_pass_through() {
        let writer = StoryWriter::new(Arc::new(Down));
        assert!(matches!(
            writer.title("x").await,
            Err(PipelineError::Upstream(_))
        ));
    }
}
