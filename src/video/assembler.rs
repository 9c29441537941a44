use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rand::{rngs::SmallRng, SeedableRng};
use tracing::info;

use crate::audio::AudioLoader;
use crate::config::RunConfig;
use crate::error::{Result, VideoError};
use crate::video::encoder::{resolve_music, EncodeJob, EncodedVideo, VideoEncoder};
use crate::video::renderer::SlideshowRenderer;
use crate::video::timeline::SceneTimeline;
use crate::video::types::VideoParams;

/// Turns scene images and narration into a video file
#[async_trait]
pub trait Assembler: Send + Sync {
    async fn assemble(&self, images: &[PathBuf], narration: &Path, output: &Path) -> Result<EncodedVideo>;
}

/// Ken-Burns slideshow with crossfades over narration and background music
pub struct SlideshowAssembler {
    encoder: VideoEncoder,
    params: VideoParams,
    transition: f64,
    music: Option<PathBuf>,
    music_volume: f32,
    seed: Option<u64>,
}

impl SlideshowAssembler {
    pub fn from_config(config: &RunConfig) -> Self {
        let params = config.video.params.clone();
        Self {
            encoder: VideoEncoder::new(config.engines.ffmpeg_binary.clone(), params.clone()),
            params,
            transition: config.video.transition_duration,
            music: config.audio.music_file.clone(),
            music_volume: config.audio.music_volume,
            seed: config.video.seed,
        }
    }

    fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        }
    }
}

#[async_trait]
impl Assembler for SlideshowAssembler {
    async fn assemble(&self, images: &[PathBuf], narration: &Path, output: &Path) -> Result<EncodedVideo> {
        let started = Instant::now();

        if images.is_empty() {
            return Err(VideoError::InvalidParameters {
                details: "no scene images to assemble".to_string(),
            }
            .into());
        }

        let duration = AudioLoader::duration(narration).await?;
        let timeline = SceneTimeline::build(duration, images.len(), self.transition)?;

        let paths = images.to_vec();
        let params = self.params.clone();
        let mut rng = self.rng();
        let renderer = tokio::task::spawn_blocking(move || {
            SlideshowRenderer::from_images(&paths, timeline, params, &mut rng)
        })
        .await
        .map_err(|e| VideoError::FrameProcessingFailed {
            reason: e.to_string(),
        })??;

        renderer.log_plan();
        info!(
            "   Rendering {} frames at {}x{} @ {} fps",
            renderer.frame_count(),
            self.params.width(),
            self.params.height(),
            self.params.fps
        );

        let job = EncodeJob {
            narration: narration.to_path_buf(),
            music: resolve_music(self.music.as_deref(), duration).await,
            music_volume: self.music_volume,
            duration,
            output: output.to_path_buf(),
        };

        if let Some(music) = &job.music {
            info!("   Background music: {} (volume {:.2})", music.display(), job.music_volume);
        }

        let encoded = self.encoder.encode(Arc::new(renderer), &job).await?;
        info!("   Assembly took {:.1}s", started.elapsed().as_secs_f64());
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_no_images_is_rejected() {
        let assembler = SlideshowAssembler::from_config(&RunConfig::default());
        let dir = tempdir().unwrap();
        let result = assembler
            .assemble(&[], &dir.path().join("a.wav"), &dir.path().join("out.mp4"))
            .await;
        assert!(matches!(result, Err(PipelineError::Video(VideoError::InvalidParameters { .. }))));
    }

    #[tokio::test]
    async fn test_missing_narration_fails_before_encoding() {
        let assembler = SlideshowAssembler::from_config(&RunConfig::default());
        let dir = tempdir().unwrap();
        let result = assembler
            .assemble(
                &[dir.path().join("scene_01.png")],
                &dir.path().join("missing.wav"),
                &dir.path().join("out.mp4"),
            )
            .await;
        assert!(matches!(result, Err(PipelineError::Audio(_))));
    }

    #[test]
    fn test_seeded_rng_is_repeatable() {
        use rand::Rng;
        let mut config = RunConfig::default();
        config.video.seed = Some(7);
        let assembler = SlideshowAssembler::from_config(&config);
        let a: u32 = assembler.rng().gen();
        let b: u32 = assembler.rng().gen();
        assert_eq!(a, b);
    }
}
