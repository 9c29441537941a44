//! # Imaging Module
//!
//! One diffusion call per scene. A scene with a usable base image is refined
//! with image-to-image, every other scene is generated from text. Only one
//! model variant is held at a time; [`ModelSlot`] swaps variants when the
//! next scene needs the other mode.

pub mod diffusion_cli;
pub mod slot;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use image::{imageops::FilterType, ImageFormat};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::ImageConfig;
use crate::error::{ImageError, Result};
use crate::pipeline::format_duration;
use crate::story::{scene_image_path, Scene};

pub use diffusion_cli::StableDiffusionCli;
pub use slot::ModelSlot;

/// Model variant a scene needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    TextToImage,
    ImageToImage,
}

impl GenerationMode {
    pub fn label(&self) -> &'static str {
        match self {
            GenerationMode::TextToImage => "T2I",
            GenerationMode::ImageToImage => "I2I",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Starting image for image-to-image
#[derive(Debug, Clone, PartialEq)]
pub struct InitImage {
    pub path: PathBuf,
    /// How far to move away from the init image (0 keeps it, 1 ignores it)
    pub strength: f32,
}

/// Parameters of one diffusion call
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f32,
    pub init: Option<InitImage>,
}

/// A loaded model variant
#[async_trait]
pub trait DiffusionPipeline: Send + Sync {
    fn mode(&self) -> GenerationMode;

    async fn generate(&self, request: &ImageRequest, output: &Path) -> Result<()>;
}

/// Something that can load model variants
#[async_trait]
pub trait DiffusionBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self, mode: GenerationMode) -> Result<Box<dyn DiffusionPipeline>>;
}

/// Decide the mode for a scene, warning when a configured base image is missing
pub fn mode_for(scene: &Scene, index: usize) -> GenerationMode {
    match &scene.base_image {
        Some(path) if path.is_file() => GenerationMode::ImageToImage,
        Some(path) => {
            warn!(
                "Scene {} (T2I) - base image '{}' not found. Generating from scratch.",
                index + 1,
                path.display()
            );
            GenerationMode::TextToImage
        }
        None => GenerationMode::TextToImage,
    }
}

/// The image synthesizer stage
pub struct ImageStage {
    backend: Box<dyn DiffusionBackend>,
    settings: ImageConfig,
}

impl ImageStage {
    pub fn new(backend: Box<dyn DiffusionBackend>, settings: ImageConfig) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &ImageConfig {
        &self.settings
    }

    /// Generate `scene_NN.png` for every scene into `dir`, in scene order
    pub async fn generate_scenes(&self, scenes: &[Scene], dir: &Path) -> Result<Vec<PathBuf>> {
        if scenes.is_empty() {
            return Err(ImageError::NoScenes.into());
        }

        tokio::fs::create_dir_all(dir).await?;
        info!("Starting image generation with {} ({} scenes)", self.backend.name(), scenes.len());

        let mut slot = ModelSlot::new(self.backend.as_ref());
        let result = self.generate_all(&mut slot, scenes, dir).await;
        // Release on success and failure alike
        slot.release().await;

        let paths = result?;
        info!("Images saved to: {}", dir.display());
        Ok(paths)
    }

    async fn generate_all(&self, slot: &mut ModelSlot<'_>, scenes: &[Scene], dir: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(scenes.len());

        for (i, scene) in scenes.iter().enumerate() {
            let started = Instant::now();
            let mode = mode_for(scene, i);
            let output = scene_image_path(dir, i);

            // The temporary base image must outlive the generate call
            let (init, _prepared) = match (mode, &scene.base_image) {
                (GenerationMode::ImageToImage, Some(base)) => {
                    info!("Generating scene {} (I2I) from: {}", i + 1, base.display());
                    let file = prepare_base_image(base, self.settings.width, self.settings.height).await?;
                    let init = InitImage {
                        path: file.path().to_path_buf(),
                        strength: self.settings.strength,
                    };
                    (Some(init), Some(file))
                }
                _ => {
                    if scene.base_image.is_none() {
                        info!("Generating scene {} (T2I) from scratch.", i + 1);
                    }
                    (None, None)
                }
            };

            let request = ImageRequest {
                prompt: scene.prompt.clone(),
                negative_prompt: self.settings.negative_prompt.clone(),
                width: self.settings.width,
                height: self.settings.height,
                steps: match mode {
                    GenerationMode::TextToImage => self.settings.text_steps,
                    GenerationMode::ImageToImage => self.settings.image_steps,
                },
                guidance_scale: self.settings.guidance_scale,
                init,
            };

            let pipeline = slot.ensure(mode).await?;
            pipeline
                .generate(&request, &output)
                .await
                .map_err(|e| ImageError::GenerationFailed {
                    scene: i + 1,
                    reason: e.to_string(),
                })?;

            if !output.is_file() {
                return Err(ImageError::GenerationFailed {
                    scene: i + 1,
                    reason: format!("no image written to {}", output.display()),
                }
                .into());
            }

            info!(
                "  ✓ Scene {:02}/{:02} [{}] in {}",
                i + 1,
                scenes.len(),
                mode,
                format_duration(started.elapsed().as_secs_f64())
            );
            paths.push(output);
        }

        Ok(paths)
    }
}

/// Convert a base image to RGB at the generation size, as a temporary PNG
pub async fn prepare_base_image(path: &Path, width: u32, height: u32) -> Result<NamedTempFile> {
    let source = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || -> std::result::Result<NamedTempFile, String> {
        let image = image::open(&source).map_err(|e| format!("cannot read image: {}", e))?;
        let rgb = image::DynamicImage::ImageRgb8(image.to_rgb8()).resize_exact(width, height, FilterType::Lanczos3);

        let file = tempfile::Builder::new()
            .prefix("reelsmith_base_")
            .suffix(".png")
            .tempfile()
            .map_err(|e| format!("cannot create temporary file: {}", e))?;
        rgb.save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| format!("cannot write PNG: {}", e))?;
        Ok(file)
    })
    .await;

    let failed = |reason: String| ImageError::BaseImageFailed {
        path: path.display().to_string(),
        reason,
    };

    match result {
        Ok(Ok(file)) => Ok(file),
        Ok(Err(reason)) => Err(failed(reason).into()),
        Err(e) => Err(failed(format!("conversion task failed: {}", e)).into()),
    }
}
