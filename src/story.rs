//! Story list input and the per-story output layout.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoryError};

/// One scene: a diffusion prompt and an optional image to start from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub prompt: String,

    /// Existing image to refine with image-to-image
    #[serde(default, alias = "imagem_base", skip_serializing_if = "Option::is_none")]
    pub base_image: Option<PathBuf>,
}

impl Scene {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            base_image: None,
        }
    }

    pub fn with_base_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_image = Some(path.into());
        self
    }
}

/// A single video to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(default, alias = "id_video", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Text read by the speech engine
    #[serde(alias = "historia_completa")]
    pub narration: String,

    #[serde(alias = "cenas")]
    pub scenes: Vec<Scene>,

    /// Translate captions to English (defaults to true)
    #[serde(default, alias = "legendar_em_ingles", skip_serializing_if = "Option::is_none")]
    pub translate_captions: Option<bool>,
}

impl Story {
    /// Identifier used in file names: `id` or `video_NNN` (1-based)
    pub fn video_id(&self, index: usize) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("video_{:03}", index + 1),
        }
    }

    pub fn wants_translation(&self) -> bool {
        self.translate_captions.unwrap_or(true)
    }

    /// Check the story can be produced
    pub fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: &str| StoryError::Invalid {
            id: self.video_id(index),
            reason: reason.to_string(),
        };

        if self.narration.trim().is_empty() {
            return Err(invalid("narration is empty").into());
        }

        if self.scenes.is_empty() {
            return Err(invalid("no scenes").into());
        }

        if let Some(n) = self.scenes.iter().position(|s| s.prompt.trim().is_empty()) {
            return Err(invalid(&format!("scene {} has an empty prompt", n + 1)).into());
        }

        Ok(())
    }
}

/// Read the JSON story array
pub fn load_stories<P: AsRef<Path>>(path: P) -> Result<Vec<Story>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|_| StoryError::FileNotFound {
        path: path.display().to_string(),
    })?;

    let stories: Vec<Story> = serde_json::from_str(&content).map_err(|e| StoryError::ParseFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    Ok(stories)
}

/// Where one story's artifacts go
#[derive(Debug, Clone, PartialEq)]
pub struct StoryPaths {
    pub id: String,
    pub narration: PathBuf,
    pub images_dir: PathBuf,
    pub base_video: PathBuf,
    pub final_video: PathBuf,
}

impl StoryPaths {
    pub fn new(output_dir: &Path, id: &str) -> Self {
        Self {
            id: id.to_string(),
            narration: output_dir.join(format!("{}_audio.wav", id)),
            images_dir: output_dir.join(format!("images_{}", id)),
            base_video: output_dir.join(format!("{}_base.mp4", id)),
            final_video: output_dir.join(format!("{}_final.mp4", id)),
        }
    }

    /// `scene_01.png`, `scene_02.png`, ... (`index` is 0-based)
    pub fn scene_image(&self, index: usize) -> PathBuf {
        scene_image_path(&self.images_dir, index)
    }

    /// Caption file kept next to the final video
    pub fn captions_ass(&self) -> PathBuf {
        self.final_video.with_extension("ass")
    }

    pub fn captions_srt(&self) -> PathBuf {
        self.final_video.with_extension("srt")
    }
}

pub fn scene_image_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("scene_{:02}.png", index + 1))
}
