use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Represents a single video frame
///
/// Thin wrapper around an RGB image buffer; the raw bytes are what gets
/// streamed into the encoder.
#[derive(Clone, Debug)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self { buffer: ImageBuffer::new(width, height) }
    }

    /// Solid colour frame
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Raw interleaved RGB24 bytes
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Mix `other` over this frame, `alpha` being the weight of `other`
    ///
    /// Frames must have the same dimensions; `alpha` is clamped to 0.0-1.0.
    pub fn blend_with(&mut self, other: &Frame, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        let keep = 1.0 - alpha;

        for (dst, src) in self.buffer.as_mut().iter_mut().zip(other.buffer.as_raw()) {
            *dst = (*dst as f32 * keep + *src as f32 * alpha).round() as u8;
        }
    }
}

/// Video encoding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoParams {
    /// Output resolution (width, height); vertical by default
    #[serde(alias = "format")]
    pub resolution: (u32, u32),

    /// Output frame rate
    pub fps: f64,

    /// ffmpeg video encoder
    pub codec: String,

    /// x264 preset
    pub preset: String,

    /// Constant rate factor (0-51, lower is better)
    pub crf: u8,

    /// Encoder threads
    pub threads: usize,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            resolution: (1080, 1920),
            fps: 30.0,
            codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            threads: num_cpus::get(),
        }
    }
}

impl VideoParams {
    pub fn width(&self) -> u32 {
        self.resolution.0
    }

    pub fn height(&self) -> u32 {
        self.resolution.1
    }

    /// Number of frames needed to cover `duration` seconds
    pub fn frame_count(&self, duration: f64) -> usize {
        (duration * self.fps).ceil().max(0.0) as usize
    }
}
