use std::ops::Range;
use std::path::Path;

use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{Result, VideoError};
use crate::video::kenburns::{KenBurnsShot, Motion};
use crate::video::timeline::SceneTimeline;
use crate::video::types::{Frame, VideoParams};

/// Renders slideshow frames: Ken-Burns shots joined by crossfades
pub struct SlideshowRenderer {
    shots: Vec<KenBurnsShot>,
    timeline: SceneTimeline,
    params: VideoParams,
}

impl SlideshowRenderer {
    /// Load scene images and pick a random motion for each
    pub fn from_images<P, R>(
        image_paths: &[P],
        timeline: SceneTimeline,
        params: VideoParams,
        rng: &mut R,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        R: Rng + ?Sized,
    {
        if image_paths.len() != timeline.windows().len() {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "{} images for {} timeline scenes",
                    image_paths.len(),
                    timeline.windows().len()
                ),
            }
            .into());
        }

        let mut shots = Vec::with_capacity(image_paths.len());
        for (i, path) in image_paths.iter().enumerate() {
            let path = path.as_ref();
            let image = image::open(path).map_err(|_| VideoError::LoadFailed {
                path: path.display().to_string(),
            })?;

            let motion = Motion::random(rng);
            debug!("Scene {} ({}x{}) -> {}", i + 1, image.width(), image.height(), motion.name());
            shots.push(KenBurnsShot::new(&image, motion, params.resolution));
        }

        Ok(Self::new(shots, timeline, params))
    }

    pub fn new(shots: Vec<KenBurnsShot>, timeline: SceneTimeline, params: VideoParams) -> Self {
        Self {
            shots,
            timeline,
            params,
        }
    }

    pub fn params(&self) -> &VideoParams {
        &self.params
    }

    pub fn timeline(&self) -> &SceneTimeline {
        &self.timeline
    }

    /// Total number of frames in the slideshow
    pub fn frame_count(&self) -> usize {
        self.params.frame_count(self.timeline.total())
    }

    /// Render frame number `index`
    pub fn render_frame(&self, index: usize) -> Frame {
        let time = index as f64 / self.params.fps;
        let plan = self.timeline.plan_at(time);
        let size = self.params.resolution;

        let (primary, progress) = plan.primary;
        let mut frame = self.shots[primary].render(progress, size);

        if let Some((incoming, progress, alpha)) = plan.incoming {
            let overlay = self.shots[incoming].render(progress, size);
            frame.blend_with(&overlay, alpha);
        }

        frame
    }

    /// Render a contiguous range of frames in parallel, in order
    pub fn render_range(&self, range: Range<usize>) -> Vec<Frame> {
        range.into_par_iter().map(|i| self.render_frame(i)).collect()
    }

    pub fn log_plan(&self) {
        info!(
            "   Duration: {:.2}s | Scenes: {} | Per scene: {:.2}s | Crossfade: {:.2}s",
            self.timeline.total(),
            self.shots.len(),
            self.timeline.slot_duration(),
            self.timeline.transition()
        );
        for (shot, window) in self.shots.iter().zip(self.timeline.windows()) {
            debug!(
                "   Scene {:02}: {:.2}s-{:.2}s {}",
                window.index + 1,
                window.start,
                window.end,
                shot.motion().name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgb};
    use rand::{rngs::SmallRng, SeedableRng};
    use tempfile::tempdir;

    fn small_params() -> VideoParams {
        VideoParams {
            resolution: (32, 56),
            fps: 10.0,
            ..VideoParams::default()
        }
    }

    fn solid(color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(24, 32, Rgb(color)))
    }

    #[test]
    fn test_crossfade_mixes_scenes() {
        let params = small_params();
        let timeline = SceneTimeline::build(2.0, 2, 0.4).unwrap();
        let shots = vec![
            KenBurnsShot::new(&solid([0, 0, 0]), Motion::ZoomIn, params.resolution),
            KenBurnsShot::new(&solid([200, 200, 200]), Motion::PanLeftToRight, params.resolution),
        ];
        let renderer = SlideshowRenderer::new(shots, timeline, params);

        assert_eq!(renderer.frame_count(), 20);
        // frame 0 is pure scene one
        assert_eq!(renderer.render_frame(0).get_pixel(5, 5), [0, 0, 0]);
        // t = 0.8s is halfway through the fade that starts at 0.6s
        assert_eq!(renderer.render_frame(8).get_pixel(5, 5), [100, 100, 100]);
        // t = 1.5s is scene two only
        assert_eq!(renderer.render_frame(15).get_pixel(5, 5), [200, 200, 200]);
    }

    #[test]
    fn test_render_range_in_order() {
        let params = small_params();
        let timeline = SceneTimeline::build(1.0, 1, 0.0).unwrap();
        let shots = vec![KenBurnsShot::new(&solid([10, 20, 30]), Motion::ZoomOut, params.resolution)];
        let renderer = SlideshowRenderer::new(shots, timeline, params);

        let frames = renderer.render_range(0..renderer.frame_count());
        assert_eq!(frames.len(), 10);
        assert!(frames.iter().all(|f| f.width() == 32 && f.height() == 56));
    }

    #[test]
    fn test_from_images_checks_counts_and_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene_01.png");
        solid([1, 2, 3]).save(&path).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);

        let timeline = SceneTimeline::build(3.0, 2, 0.5).unwrap();
        let mismatch = SlideshowRenderer::from_images(&[&path], timeline, small_params(), &mut rng);
        assert!(mismatch.is_err());

        let timeline = SceneTimeline::build(3.0, 1, 0.5).unwrap();
        let missing = dir.path().join("nope.png");
        assert!(SlideshowRenderer::from_images(&[&missing], timeline.clone(), small_params(), &mut rng).is_err());

        let ok = SlideshowRenderer::from_images(&[&path], timeline, small_params(), &mut rng).unwrap();
        assert_eq!(ok.frame_count(), 30);
    }
}
