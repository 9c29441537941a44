//! # Reelsmith
//!
//! Turn narration scripts and scene prompts into captioned vertical videos.
//!
//! Each story in a batch is narrated with a text-to-speech engine, illustrated
//! with one diffusion image per scene, assembled into a Ken-Burns slideshow
//! over the narration and background music, and finally transcribed and
//! captioned. The heavy lifting is done by external command-line tools; this
//! crate sequences them, keeps the files in order and reports what happened.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reelsmith::{config::RunConfig, pipeline::VideoPipeline, story::load_stories};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = RunConfig::from_file("config.json")?;
//! let stories = load_stories(&config.stories_file)?;
//!
//! let pipeline = VideoPipeline::from_config(config)?;
//! let summary = pipeline.run_batch(&stories).await;
//! summary.log_report();
//!
//! std::process::exit(summary.outcome().exit_code());
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`story`] - Story list input and output file layout
//! - [`speech`] - Narration synthesis
//! - [`imaging`] - Scene images with text-to-image / image-to-image swapping
//! - [`video`] - Ken-Burns slideshow rendering and encoding
//! - [`captions`] - Transcription, ASS styling and subtitle burning
//! - [`pipeline`] - Batch orchestration and the run report
//! - [`config`] - Configuration management
//!
//! ## Custom stages
//!
//! Every stage sits behind a trait, so a different engine can be dropped in
//! through [`pipeline::Stages`]:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use async_trait::async_trait;
//! use reelsmith::speech::{SpeechRequest, SpeechSynthesizer};
//!
//! struct Silence;
//!
//! #[async_trait]
//! impl SpeechSynthesizer for Silence {
//!     fn name(&self) -> &str {
//!         "silence"
//!     }
//!
//!     async fn synthesize(&self, _request: &SpeechRequest, output: &Path) -> reelsmith::Result<()> {
//!         // Write a WAV file to `output`
//!         Ok(())
//!     }
//! }
//! ```

pub mod audio;
pub mod captions;
pub mod config;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod imaging;
pub mod logging;
pub mod pipeline;
pub mod speech;
pub mod story;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::RunConfig,
    error::{PipelineError, Result},
    pipeline::{RunOutcome, RunSummary, VideoPipeline},
    story::{Scene, Story},
};
