//! # Captions Module
//!
//! Word-level captions in the short-video style: the finished base video is
//! transcribed (optionally translated to English), grouped into a few words
//! per line, written as an ASS script and burned in with ffmpeg.
//!
//! ```rust,no_run
//! use reelsmith::captions::{CaptionGenerator, TranscriptionTask};
//! use reelsmith::config::RunConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = RunConfig::from_file("config.json")?;
//! let generator = CaptionGenerator::from_config(&config)?;
//! generator
//!     .generate(
//!         "output/video_001_base.mp4".as_ref(),
//!         "output/video_001_final.mp4".as_ref(),
//!         TranscriptionTask::Translate,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod ass;
pub mod burn;
pub mod generator;
pub mod srt;
pub mod transcript;
pub mod whisper;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use ass::{format_ass_time, AssColor, AssDocument, CaptionStyle};
pub use burn::{burn_subtitles, FfmpegBurner, SubtitleBurner};
pub use generator::{BatchCaptionSummary, CaptionGenerator, CaptionReport};
pub use srt::{format_srt_time, SrtDocument};
pub use transcript::{Segment, Transcript, Word};
pub use whisper::WhisperCli;

/// Keep the spoken language or translate to English
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionTask {
    Transcribe,
    Translate,
}

impl TranscriptionTask {
    pub fn from_translate(translate: bool) -> Self {
        if translate {
            TranscriptionTask::Translate
        } else {
            TranscriptionTask::Transcribe
        }
    }
}

/// Speech-to-text with word timestamps
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(&self, media: &Path, task: TranscriptionTask) -> Result<Transcript>;

    /// Free the model; called after every captioning run
    async fn release(&self) {}
}

/// The caption step as seen by the pipeline
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, input: &Path, output: &Path, task: TranscriptionTask) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_from_flag() {
        assert_eq!(TranscriptionTask::from_translate(true), TranscriptionTask::Translate);
        assert_eq!(TranscriptionTask::from_translate(false), TranscriptionTask::Transcribe);
    }
}
