//! # Audio Module
//!
//! Reads narration and music files just far enough to know how long they
//! play. The slideshow is timed against the narration, and the music is
//! looped or trimmed to match it.
//!
//! ```rust,no_run
//! use reelsmith::audio::AudioLoader;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let seconds = AudioLoader::duration("output/video_001_audio.wav").await?;
//! println!("Narration runs {:.1}s", seconds);
//! # Ok(())
//! # }
//! ```

pub mod loader;

pub use loader::{AudioInfo, AudioLoader};
