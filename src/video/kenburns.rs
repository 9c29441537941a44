//! Ken-Burns motion: a slow zoom or pan over a still image.
//!
//! Source images are first scaled to cover the output frame with 10%
//! overscan, so every motion has room to move without exposing an edge.

use image::{imageops, imageops::FilterType, DynamicImage, RgbImage};
use rand::Rng;

use crate::video::types::Frame;

/// Extra scale applied on top of "cover" sizing
pub const OVERSCAN: f64 = 1.1;

/// One of the four camera moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    ZoomIn,
    ZoomOut,
    PanLeftToRight,
    PanRightToLeft,
}

/// Crop rectangle in source-image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Motion {
    pub const ALL: [Motion; 4] = [
        Motion::ZoomIn,
        Motion::ZoomOut,
        Motion::PanLeftToRight,
        Motion::PanRightToLeft,
    ];

    /// Pick a motion uniformly at random
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Motion::ZoomIn => "zoom-in",
            Motion::ZoomOut => "zoom-out",
            Motion::PanLeftToRight => "pan-left-to-right",
            Motion::PanRightToLeft => "pan-right-to-left",
        }
    }

    /// Visible part of a `source` image at `progress` (0.0-1.0) through the shot
    ///
    /// `source` is the overscanned image size, `frame` the output size.
    /// Zooms go between 1.0x and 1.1x about the centre; pans sweep
    /// horizontally edge to edge with the view vertically centred.
    pub fn viewport(&self, progress: f64, source: (u32, u32), frame: (u32, u32)) -> Viewport {
        let t = progress.clamp(0.0, 1.0);
        let (src_w, src_h) = (source.0 as f64, source.1 as f64);
        let (frame_w, frame_h) = (frame.0 as f64, frame.1 as f64);

        match self {
            Motion::ZoomIn | Motion::ZoomOut => {
                let zoom = match self {
                    Motion::ZoomIn => 1.0 + 0.1 * t,
                    _ => 1.1 - 0.1 * t,
                };
                let width = (frame_w / zoom).min(src_w);
                let height = (frame_h / zoom).min(src_h);
                Viewport {
                    x: (src_w - width) / 2.0,
                    y: (src_h - height) / 2.0,
                    width,
                    height,
                }
            }
            Motion::PanLeftToRight | Motion::PanRightToLeft => {
                let width = frame_w.min(src_w);
                let height = frame_h.min(src_h);
                let travel = src_w - width;
                let x = match self {
                    Motion::PanLeftToRight => travel * t,
                    _ => travel * (1.0 - t),
                };
                Viewport {
                    x,
                    y: (src_h - height) / 2.0,
                    width,
                    height,
                }
            }
        }
    }
}

/// Size an image must be scaled to so it covers `frame` with overscan
pub fn cover_size(image: (u32, u32), frame: (u32, u32)) -> (u32, u32) {
    let (img_w, img_h) = (image.0.max(1) as f64, image.1.max(1) as f64);
    let scale = (frame.0 as f64 / img_w).max(frame.1 as f64 / img_h) * OVERSCAN;
    (
        (img_w * scale).round().max(frame.0 as f64) as u32,
        (img_h * scale).round().max(frame.1 as f64) as u32,
    )
}

/// A scene image prepared for Ken-Burns rendering
#[derive(Debug, Clone)]
pub struct KenBurnsShot {
    source: RgbImage,
    motion: Motion,
}

impl KenBurnsShot {
    /// Scale `image` to cover `frame` and attach a motion
    pub fn new(image: &DynamicImage, motion: Motion, frame: (u32, u32)) -> Self {
        let (width, height) = cover_size((image.width(), image.height()), frame);
        let source = image.resize_exact(width, height, FilterType::Triangle).to_rgb8();
        Self { source, motion }
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    /// Render the shot at `progress` into an output-sized frame
    pub fn render(&self, progress: f64, frame: (u32, u32)) -> Frame {
        let view = self
            .motion
            .viewport(progress, (self.source.width(), self.source.height()), frame);

        let x = view.x.round().max(0.0) as u32;
        let y = view.y.round().max(0.0) as u32;
        let width = (view.width.round() as u32).clamp(1, self.source.width() - x.min(self.source.width() - 1));
        let height = (view.height.round() as u32).clamp(1, self.source.height() - y.min(self.source.height() - 1));

        let crop = imageops::crop_imm(&self.source, x, y, width, height).to_image();
        if crop.width() == frame.0 && crop.height() == frame.1 {
            Frame::new(crop)
        } else {
            Frame::new(imageops::resize(&crop, frame.0, frame.1, FilterType::Triangle))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use rand::{rngs::SmallRng, SeedableRng};

    const FRAME: (u32, u32) = (108, 192);

    #[test]
    fn test_cover_size_portrait_source() {
        // 768x1024 into 1080x1920: height is the limiting side
        let (w, h) = cover_size((768, 1024), (1080, 1920));
        assert_eq!(h, 2112);
        assert_eq!(w, 1584);
    }

    #[test]
    fn test_cover_size_never_smaller_than_frame() {
        let (w, h) = cover_size((4000, 100), (1080, 1920));
        assert!(w >= 1080 && h >= 1920);
    }

    #[test]
    fn test_zoom_in_shrinks_viewport() {
        let source = cover_size((768, 1024), FRAME);
        let start = Motion::ZoomIn.viewport(0.0, source, FRAME);
        let end = Motion::ZoomIn.viewport(1.0, source, FRAME);

        assert!((start.width - FRAME.0 as f64).abs() < 1e-9);
        assert!((end.width - FRAME.0 as f64 / 1.1).abs() < 1e-9);
        // stays centred
        assert!((start.x + start.width / 2.0 - source.0 as f64 / 2.0).abs() < 1e-9);
        assert!((end.y + end.height / 2.0 - source.1 as f64 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_out_mirrors_zoom_in() {
        let source = cover_size((768, 1024), FRAME);
        let zoom_in = Motion::ZoomIn.viewport(0.25, source, FRAME);
        let zoom_out = Motion::ZoomOut.viewport(0.75, source, FRAME);
        assert!((zoom_in.width - zoom_out.width).abs() < 1e-9);
    }

    #[test]
    fn test_pans_sweep_edge_to_edge() {
        let source = cover_size((768, 1024), FRAME);
        let travel = source.0 as f64 - FRAME.0 as f64;

        let ltr_start = Motion::PanLeftToRight.viewport(0.0, source, FRAME);
        let ltr_end = Motion::PanLeftToRight.viewport(1.0, source, FRAME);
        assert_eq!(ltr_start.x, 0.0);
        assert!((ltr_end.x - travel).abs() < 1e-9);

        let rtl_start = Motion::PanRightToLeft.viewport(0.0, source, FRAME);
        let rtl_end = Motion::PanRightToLeft.viewport(1.0, source, FRAME);
        assert!((rtl_start.x - travel).abs() < 1e-9);
        assert_eq!(rtl_end.x, 0.0);
    }

    #[test]
    fn test_progress_is_clamped() {
        let source = cover_size((768, 1024), FRAME);
        assert_eq!(
            Motion::PanLeftToRight.viewport(2.0, source, FRAME),
            Motion::PanLeftToRight.viewport(1.0, source, FRAME)
        );
    }

    #[test]
    fn test_seeded_choice_is_repeatable() {
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        let first: Vec<Motion> = (0..8).map(|_| Motion::random(&mut a)).collect();
        let second: Vec<Motion> = (0..8).map(|_| Motion::random(&mut b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_outputs_frame_size() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_fn(77, 103, |x, _| Rgb([x as u8, 10, 20])));
        for motion in Motion::ALL {
            let shot = KenBurnsShot::new(&image, motion, FRAME);
            for progress in [0.0, 0.5, 1.0] {
                let frame = shot.render(progress, FRAME);
                assert_eq!((frame.width(), frame.height()), FRAME);
            }
        }
    }
}
