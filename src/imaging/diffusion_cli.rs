use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::config::RunConfig;
use crate::engine;
use crate::error::{ImageError, Result};
use crate::imaging::{DiffusionBackend, DiffusionPipeline, GenerationMode, ImageRequest};

/// stable-diffusion.cpp through its `sd` command-line tool
///
/// Each generation is one `sd` process, so a "loaded" pipeline is just the
/// validated model path plus the mode flags.
pub struct StableDiffusionCli {
    binary: String,
    model: PathBuf,
}

impl StableDiffusionCli {
    pub fn new(binary: impl Into<String>, model: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.engines.diffusion_binary.clone(), &config.models.image)
    }
}

#[async_trait]
impl DiffusionBackend for StableDiffusionCli {
    fn name(&self) -> &str {
        "stable-diffusion.cpp"
    }

    async fn load(&self, mode: GenerationMode) -> Result<Box<dyn DiffusionPipeline>> {
        if !tokio::fs::try_exists(&self.model).await.unwrap_or(false) {
            return Err(ImageError::ModelNotFound {
                path: self.model.display().to_string(),
            }
            .into());
        }

        info!("Model {} ready for {}", self.model.display(), mode);
        Ok(Box::new(SdPipeline {
            binary: self.binary.clone(),
            model: self.model.clone(),
            mode,
        }))
    }
}

struct SdPipeline {
    binary: String,
    model: PathBuf,
    mode: GenerationMode,
}

impl SdPipeline {
    fn build_args(&self, request: &ImageRequest, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.model.display().to_string(),
            "-p".to_string(),
            request.prompt.clone(),
            "-n".to_string(),
            request.negative_prompt.clone(),
            "--steps".to_string(),
            request.steps.to_string(),
            "--cfg-scale".to_string(),
            request.guidance_scale.to_string(),
            "-H".to_string(),
            request.height.to_string(),
            "-W".to_string(),
            request.width.to_string(),
        ];

        if let (GenerationMode::ImageToImage, Some(init)) = (self.mode, &request.init) {
            args.extend([
                "-M".to_string(),
                "img2img".to_string(),
                "-i".to_string(),
                init.path.display().to_string(),
                "--strength".to_string(),
                init.strength.to_string(),
            ]);
        }

        args.push("-o".to_string());
        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl DiffusionPipeline for SdPipeline {
    fn mode(&self) -> GenerationMode {
        self.mode
    }

    async fn generate(&self, request: &ImageRequest, output: &Path) -> Result<()> {
        if self.mode == GenerationMode::ImageToImage && request.init.is_none() {
            return Err(ImageError::BaseImageFailed {
                path: "<none>".to_string(),
                reason: "image-to-image request without a base image".to_string(),
            }
            .into());
        }

        engine::run(&self.binary, self.build_args(request, output)).await?;
        Ok(())
    }
}
