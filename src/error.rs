use std::path::PathBuf;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Failure kinds for the generation stages.
///
/// Every stage returns one of these; the generator records it against the
/// stage and moves on to the next one.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Language model request failed: {0}")]
    Upstream(String),

    #[error("Speech request failed: {0}")]
    Network(String),

    #[error("Audio generation failed: no chunk out of {chunks} was synthesized")]
    AudioGeneration { chunks: usize },

    #[error("Missing asset: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Story is empty")]
    EmptyStory,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Media processing failed: {0}")]
    Media(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Short label used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Upstream(_) => "upstream",
            PipelineError::Network(_) => "network",
            PipelineError::AudioGeneration { .. } => "audio-generation",
            PipelineError::MissingAsset(_) => "missing-asset",
            PipelineError::MissingInput(_) => "missing-input",
            PipelineError::EmptyStory => "empty-story",
            PipelineError::Image(_) => "image",
            PipelineError::Media(_) => "media",
            PipelineError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_asset_names_the_path() {
        let err = PipelineError::MissingAsset(PathBuf::from("assets/background.mp4"));
        assert_eq!(err.to_string(), "Missing asset: assets/background.mp4");
        assert_eq!(err.kind(), "missing-asset");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: PipelineError = io.into();
        assert_eq!(err.kind(), "io");
    }
}
