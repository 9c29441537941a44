//! # Video Module
//!
//! Builds the slideshow that carries each story: scene images get a
//! Ken-Burns move, consecutive scenes crossfade, and the rendered frames are
//! streamed into ffmpeg together with the narration and background music.

pub mod assembler;
pub mod encoder;
pub mod kenburns;
pub mod renderer;
pub mod timeline;
pub mod types;

pub use assembler::{Assembler, SlideshowAssembler};
pub use encoder::{EncodeJob, EncodedVideo, VideoEncoder};
pub use kenburns::{KenBurnsShot, Motion};
pub use renderer::SlideshowRenderer;
pub use timeline::SceneTimeline;
pub use types::{Frame, VideoParams};
