use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    captions::AssColor,
    error::{ConfigError, Result},
    video::VideoParams,
};

/// Top-level sections that must be present in every run configuration,
/// each with the alternate names older configuration files use
const REQUIRED_KEYS: [&[&str]; 5] = [
    &["models"],
    &["audio"],
    &["video"],
    &["stories_file", "json_file"],
    &["output_dir", "output_folder"],
];

/// Main configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// JSON file holding the list of stories
    #[serde(alias = "json_file")]
    pub stories_file: PathBuf,

    /// Directory receiving audio, images and videos
    #[serde(alias = "output_folder")]
    pub output_dir: PathBuf,

    /// Model identifiers for each engine
    pub models: ModelsConfig,

    /// Narration and music settings
    pub audio: AudioConfig,

    /// Output video settings
    pub video: VideoConfig,

    /// Diffusion settings
    #[serde(default)]
    pub images: ImageConfig,

    /// Caption style settings
    #[serde(default, alias = "legendas")]
    pub captions: CaptionConfig,

    /// External tool selection
    #[serde(default)]
    pub engines: EnginesConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            stories_file: PathBuf::from("stories.json"),
            output_dir: PathBuf::from("output"),
            models: ModelsConfig::default(),
            audio: AudioConfig::default(),
            video: VideoConfig::default(),
            images: ImageConfig::default(),
            captions: CaptionConfig::default(),
            engines: EnginesConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file, or TOML when the extension is `.toml`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        if is_toml(path) {
            Self::from_toml_str(&content, path)
        } else {
            Self::from_json_str(&content, path)
        }
    }

    fn from_json_str(content: &str, path: &Path) -> Result<Self> {
        let parse_failed = |reason: String| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason,
        };

        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| parse_failed(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| parse_failed("top level must be an object".to_string()))?;
        check_required(|key| object.contains_key(key))?;

        let config = serde_json::from_value(value).map_err(|e| parse_failed(e.to_string()))?;
        Ok(config)
    }

    fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
        let parse_failed = |reason: String| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason,
        };

        let table: toml::Table = toml::from_str(content).map_err(|e| parse_failed(e.to_string()))?;
        check_required(|key| table.contains_key(key))?;

        let config = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| parse_failed(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration, format chosen by extension like [`RunConfig::from_file`]
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string(),
            })?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string(),
            })?
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.video.validate()?;
        self.images.validate()?;
        self.captions.validate()?;
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

fn check_required(has_key: impl Fn(&str) -> bool) -> Result<()> {
    for names in REQUIRED_KEYS {
        if !names.iter().any(|name| has_key(name)) {
            return Err(ConfigError::MissingKey { key: names[0].to_string() }.into());
        }
    }
    Ok(())
}

fn invalid(key: &str, value: impl ToString) -> crate::error::PipelineError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

/// Model identifiers handed to the external engines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Text-to-speech model (Coqui model name or Piper voice file)
    pub tts: String,

    /// Diffusion checkpoint used for both text-to-image and image-to-image
    #[serde(alias = "t2i")]
    pub image: String,

    /// whisper.cpp ggml model file
    #[serde(default = "default_whisper_model")]
    pub whisper: String,
}

fn default_whisper_model() -> String {
    "models/ggml-small.bin".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            tts: "tts_models/multilingual/multi-dataset/xtts_v2".to_string(),
            image: "models/sd-v1-5.safetensors".to_string(),
            whisper: default_whisper_model(),
        }
    }
}

/// Narration and background music configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Narration language code
    pub language: String,

    /// Voice sample to clone; the default speaker is used when it is missing
    pub voice_clone_wav: Option<PathBuf>,

    /// Built-in speaker used without a clone sample
    pub default_speaker: String,

    /// Background music track, looped or trimmed to the narration
    pub music_file: Option<PathBuf>,

    /// Music gain (0.0-1.0)
    pub music_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            language: "pt".to_string(),
            voice_clone_wav: None,
            default_speaker: "Ana Florence".to_string(),
            music_file: None,
            music_volume: 0.1,
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.music_volume) {
            return Err(invalid("audio.music_volume", self.music_volume));
        }

        if self.language.trim().is_empty() {
            return Err(invalid("audio.language", &self.language));
        }

        Ok(())
    }
}

/// Video output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Encoder parameters
    #[serde(flatten)]
    pub params: VideoParams,

    /// Crossfade between scenes (seconds)
    pub transition_duration: f64,

    /// Seed for Ken-Burns motion selection; random when absent
    pub seed: Option<u64>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            params: VideoParams::default(),
            transition_duration: 0.5,
            seed: None,
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        let (width, height) = self.params.resolution;
        if width == 0 || height == 0 {
            return Err(invalid("video.resolution", format!("{}x{}", width, height)));
        }

        // yuv420p needs even dimensions
        if width % 2 != 0 || height % 2 != 0 {
            return Err(invalid("video.resolution", format!("{}x{}", width, height)));
        }

        if !(self.params.fps.is_finite() && self.params.fps > 0.0) {
            return Err(invalid("video.fps", self.params.fps));
        }

        if self.params.threads == 0 {
            return Err(invalid("video.threads", self.params.threads));
        }

        if self.params.crf > 51 {
            return Err(invalid("video.crf", self.params.crf));
        }

        if self.transition_duration < 0.0 || !self.transition_duration.is_finite() {
            return Err(invalid("video.transition_duration", self.transition_duration));
        }

        Ok(())
    }
}

/// Diffusion generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub width: u32,
    pub height: u32,
    pub negative_prompt: String,

    /// Inference steps for text-to-image
    pub text_steps: u32,

    /// Inference steps for image-to-image
    pub image_steps: u32,

    pub guidance_scale: f32,

    /// How far image-to-image may move from the base (0.6 stays close, 0.8 drifts)
    pub strength: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 768,
            height: 1024,
            negative_prompt: "blurry, low quality, deformed, disfigured, text, watermark, \
                              (bad-artist:1.2), (worst quality:1.2)"
                .to_string(),
            text_steps: 25,
            image_steps: 30,
            guidance_scale: 7.5,
            strength: 0.7,
        }
    }
}

impl ImageConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid("images.size", format!("{}x{}", self.width, self.height)));
        }

        if self.text_steps == 0 {
            return Err(invalid("images.text_steps", self.text_steps));
        }

        if self.image_steps == 0 {
            return Err(invalid("images.image_steps", self.image_steps));
        }

        if !(self.strength > 0.0 && self.strength <= 1.0) {
            return Err(invalid("images.strength", self.strength));
        }

        Ok(())
    }
}

/// Caption style configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Transcribe and burn captions into the final video
    pub enabled: bool,

    #[serde(alias = "max_palavras_por_linha")]
    pub max_words_per_line: usize,

    /// Font family name as known to libass
    pub font: String,

    /// Directory with extra font files for libass
    pub fonts_dir: Option<PathBuf>,

    pub font_size: u32,
    pub font_color: String,
    pub stroke_width: u32,
    pub stroke_color: String,
    pub shadow_strength: u32,

    /// Karaoke-style colouring of the word being spoken
    pub highlight_current_word: bool,
    pub word_highlight_color: String,

    /// Distance from the bottom edge in pixels
    pub padding: u32,

    /// Keep the .ass file next to the final video
    pub keep_ass_file: bool,

    /// Also write an .srt next to the final video
    pub export_srt: bool,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_words_per_line: 3,
            font: "Impact".to_string(),
            fonts_dir: None,
            font_size: 70,
            font_color: "#FFFFFF".to_string(),
            stroke_width: 4,
            stroke_color: "#000000".to_string(),
            shadow_strength: 2,
            highlight_current_word: false,
            word_highlight_color: "#FFFF00".to_string(),
            padding: 80,
            keep_ass_file: false,
            export_srt: false,
        }
    }
}

impl CaptionConfig {
    fn validate(&self) -> Result<()> {
        if self.max_words_per_line == 0 {
            return Err(invalid("captions.max_words_per_line", self.max_words_per_line));
        }

        if self.font_size == 0 {
            return Err(invalid("captions.font_size", self.font_size));
        }

        for (key, value) in [
            ("captions.font_color", &self.font_color),
            ("captions.stroke_color", &self.stroke_color),
            ("captions.word_highlight_color", &self.word_highlight_color),
        ] {
            if AssColor::from_hex(value).is_err() {
                return Err(invalid(key, value));
            }
        }

        Ok(())
    }
}

/// Which text-to-speech front end to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngine {
    Coqui,
    Piper,
}

/// External tool binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginesConfig {
    pub speech: SpeechEngine,
    pub tts_binary: String,
    pub piper_binary: String,
    pub diffusion_binary: String,
    pub whisper_binary: String,
    pub ffmpeg_binary: String,

    /// Ask engines to run on the GPU
    pub use_gpu: bool,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            speech: SpeechEngine::Coqui,
            tts_binary: "tts".to_string(),
            piper_binary: "piper".to_string(),
            diffusion_binary: "sd".to_string(),
            whisper_binary: "whisper-cli".to_string(),
            ffmpeg_binary: "ffmpeg".to_string(),
            use_gpu: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use tempfile::tempdir;

    const MINIMAL_JSON: &str = r#"{
        "stories_file": "historias.json",
        "output_dir": "saida",
        "models": { "tts": "tts_models/multilingual/multi-dataset/xtts_v2", "image": "sd15.safetensors" },
        "audio": { "language": "pt", "music_file": "music.mp3", "music_volume": 0.15 },
        "video": { "resolution": [1080, 1920], "fps": 24, "threads": 4, "transition_duration": 0.4 }
    }"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, MINIMAL_JSON).unwrap();

        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.stories_file, PathBuf::from("historias.json"));
        assert_eq!(config.video.params.resolution, (1080, 1920));
        assert_eq!(config.video.params.fps, 24.0);
        assert_eq!(config.video.params.threads, 4);
        assert_eq!(config.video.params.crf, 23);
        assert_eq!(config.audio.default_speaker, "Ana Florence");
        assert_eq!(config.models.whisper, "models/ggml-small.bin");
        assert_eq!(config.captions.max_words_per_line, 3);
        assert_eq!(config.images.strength, 0.7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "stories_file": "s.json", "output_dir": "out", "audio": {}, "video": {} }"#)
            .unwrap();

        match RunConfig::from_file(&path) {
            Err(PipelineError::Config(ConfigError::MissingKey { key })) => assert_eq!(key, "models"),
            other => panic!("expected MissingKey, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = RunConfig::from_file("/definitely/not/here.json");
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_json_and_toml_roundtrip() {
        let dir = tempdir().unwrap();
        let mut original = RunConfig::default();
        original.captions.highlight_current_word = true;
        original.video.seed = Some(7);

        for name in ["config.json", "config.toml"] {
            let path = dir.path().join(name);
            original.save_to_file(&path).unwrap();
            let loaded = RunConfig::from_file(&path).unwrap();

            assert!(loaded.captions.highlight_current_word);
            assert_eq!(loaded.video.seed, Some(7));
            assert_eq!(loaded.video.params.resolution, original.video.params.resolution);
            assert_eq!(loaded.engines.speech, SpeechEngine::Coqui);
        }
    }

    #[test]
    fn test_invalid_music_volume() {
        let mut config = RunConfig::default();
        config.audio.music_volume = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_caption_color() {
        let mut config = RunConfig::default();
        config.captions.font_color = "white".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_odd_resolution_rejected() {
        let mut config = RunConfig::default();
        config.video.params.resolution = (1081, 1920);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_legacy_key_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "json_file": "historias.json",
                "output_folder": "videos_gerados",
                "models": { "tts": "tts_models/multilingual/multi-dataset/xtts_v2", "t2i": "runwayml/stable-diffusion-v1-5" },
                "audio": { "language": "pt", "voice_clone_wav": "voz.wav", "music_file": "musica.mp3", "music_volume": 0.1 },
                "video": { "format": [1080, 1920], "fps": 24, "threads": 4, "transition_duration": 0.5, "whisper_model": "small" },
                "legendas": { "max_palavras_por_linha": 2, "font": "Impact", "font_size": 70 }
            }"#,
        )
        .unwrap();

        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.stories_file, PathBuf::from("historias.json"));
        assert_eq!(config.output_dir, PathBuf::from("videos_gerados"));
        assert_eq!(config.models.image, "runwayml/stable-diffusion-v1-5");
        assert_eq!(config.video.params.resolution, (1080, 1920));
        assert_eq!(config.video.params.fps, 24.0);
        assert_eq!(config.captions.max_words_per_line, 2);
        assert_eq!(config.audio.voice_clone_wav, Some(PathBuf::from("voz.wav")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_key_reports_primary_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "json_file": "s.json", "models": { "tts": "t", "image": "i" }, "audio": {}, "video": {} }"#,
        )
        .unwrap();

        match RunConfig::from_file(&path) {
            Err(PipelineError::Config(ConfigError::MissingKey { key })) => assert_eq!(key, "output_dir"),
            other => panic!("expected MissingKey, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_fps_rejected() {
        for fps in [f64::NAN, f64::INFINITY, 0.0, -24.0] {
            let mut config = RunConfig::default();
            config.video.params.fps = fps;
            assert!(config.validate().is_err(), "fps {} accepted", fps);
        }
    }

    #[test]
    fn test_zero_words_per_line_rejected() {
        let mut config = RunConfig::default();
        config.captions.max_words_per_line = 0;
        assert!(config.validate().is_err());
    }
}
