use thiserror::Error;

/// Main error type for the reelsmith library
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Story error: {0}")]
    Story(#[from] StoryError),

    #[error("Speech synthesis error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Image generation error: {0}")]
    Image(#[from] ImageError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Audio processing error: {0}")]
    Audio(#[from] AudioError),

    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    #[error("External tool error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path} ({reason})")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Story list and per-story input errors
#[derive(Error, Debug)]
pub enum StoryError {
    #[error("Failed to read story file: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse story file: {path} ({reason})")]
    ParseFailed { path: String, reason: String },

    #[error("Story '{id}' is invalid: {reason}")]
    Invalid { id: String, reason: String },
}

/// Text-to-speech errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Narration text is empty")]
    EmptyText,

    #[error("Speech synthesis failed: {reason}")]
    SynthesisFailed { reason: String },

    #[error("Speech engine produced no audio at {path}")]
    NoOutput { path: String },
}

/// Diffusion / image errors
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Diffusion model not found: {path}")]
    ModelNotFound { path: String },

    #[error("Failed to load base image: {path} ({reason})")]
    BaseImageFailed { path: String, reason: String },

    #[error("Image generation failed for scene {scene}: {reason}")]
    GenerationFailed { scene: usize, reason: String },

    #[error("No scenes to generate")]
    NoScenes,
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to load image: {path}")]
    LoadFailed { path: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Frame processing failed: {reason}")]
    FrameProcessingFailed { reason: String },

    #[error("Invalid video parameters: {details}")]
    InvalidParameters { details: String },
}

/// Audio decoding errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Transcription and subtitle errors
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("Transcription failed: {reason}")]
    TranscriptionFailed { reason: String },

    #[error("Invalid color '{value}', expected #RRGGBB")]
    InvalidColor { value: String },

    #[error("Subtitle rendering failed: {reason}")]
    RenderFailed { reason: String },
}

/// Failures of external command-line tools
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("'{program}' not found on PATH. {hint}")]
    NotFound { program: String, hint: String },

    #[error("'{program}' exited with {status}: {stderr_tail}")]
    Failed {
        program: String,
        status: String,
        stderr_tail: String,
    },

    #[error("Failed to run '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },
}

/// Convenience type alias for Results using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Errors that stop the whole run rather than a single story
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Story(StoryError::FileNotFound { .. })
                | Self::Story(StoryError::ParseFailed { .. })
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            Self::Config(ConfigError::MissingKey { key }) => {
                format!("Required field '{}' is missing from the configuration.", key)
            }
            Self::Story(StoryError::FileNotFound { path }) => {
                format!("Could not read story list '{}'. Check `stories_file` in the configuration.", path)
            }
            Self::Engine(EngineError::NotFound { program, hint }) => {
                format!("'{}' is not installed or not on PATH. {}", program, hint)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let config: PipelineError = ConfigError::MissingKey { key: "models".into() }.into();
        assert!(config.is_fatal());

        let story_file: PipelineError = StoryError::FileNotFound { path: "stories.json".into() }.into();
        assert!(story_file.is_fatal());

        let invalid_story: PipelineError = StoryError::Invalid {
            id: "a".into(),
            reason: "no scenes".into(),
        }
        .into();
        assert!(!invalid_story.is_fatal());

        let speech: PipelineError = SpeechError::EmptyText.into();
        assert!(!speech.is_fatal());
    }

    #[test]
    fn test_user_message_for_missing_tool() {
        let err: PipelineError = EngineError::NotFound {
            program: "ffmpeg".into(),
            hint: "Install FFmpeg.".into(),
        }
        .into();
        assert!(err.user_message().contains("ffmpeg"));
        assert!(err.user_message().contains("Install FFmpeg."));
    }

    #[test]
    fn test_audio_error_message() {
        let err: PipelineError = AudioError::UnsupportedFormat { format: "xyz".into() }.into();
        assert!(matches!(err, PipelineError::Audio(_)));
        assert!(err.to_string().contains("xyz"));
    }
}
