//! # Pipeline Module
//!
//! Batch orchestration. Every story goes through four steps in order:
//!
//! 1. Narration - text-to-speech into `<id>_audio.wav`
//! 2. Scene images - one diffusion call per scene into `images_<id>/`
//! 3. Assembly - Ken-Burns slideshow over narration and music into `<id>_base.mp4`
//! 4. Captions - transcription and burned-in subtitles into `<id>_final.mp4`
//!
//! A story that fails at any step is recorded and the batch moves on to
//! the next one. [`RunSummary::outcome`] maps the result to an exit code.

pub mod runner;
pub mod summary;

pub use runner::{describe_stats, Stages, StoryOutput, VideoPipeline};
pub use summary::{format_duration, RunOutcome, RunSummary, StageStats, StageTimings, StoryFailure};
