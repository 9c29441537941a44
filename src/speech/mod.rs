//! # Speech Module
//!
//! Narration synthesis. Each backend wraps a text-to-speech command-line
//! tool; the model lives only as long as the tool process, so GPU memory is
//! free again once [`SpeechSynthesizer::synthesize`] returns.

pub mod coqui;
pub mod piper;

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{AudioConfig, RunConfig, SpeechEngine};
use crate::error::{Result, SpeechError};
use crate::gpu;
use crate::pipeline::format_duration;

pub use coqui::CoquiTts;
pub use piper::Piper;

/// Which voice to speak with
#[derive(Debug, Clone, PartialEq)]
pub enum Voice {
    /// Clone the voice in this reference recording
    Clone(PathBuf),

    /// A speaker built into the model
    Named(String),
}

impl Voice {
    /// Clone voice when its sample exists, otherwise the default speaker
    pub fn from_config(audio: &AudioConfig) -> Self {
        match &audio.voice_clone_wav {
            Some(sample) if sample.is_file() => {
                info!("🎤 Voice cloning: {}", sample.display());
                Voice::Clone(sample.clone())
            }
            Some(sample) => {
                warn!("⚠️  Voice sample '{}' not found", sample.display());
                info!("🎤 Using default voice: {}", audio.default_speaker);
                Voice::Named(audio.default_speaker.clone())
            }
            None => {
                info!("🎤 Using default voice: {}", audio.default_speaker);
                Voice::Named(audio.default_speaker.clone())
            }
        }
    }
}

/// Text to speak and how to speak it
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub language: String,
    pub voice: Voice,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, audio: &AudioConfig) -> Self {
        Self {
            text: text.into(),
            language: audio.language.clone(),
            voice: Voice::from_config(audio),
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// A text-to-speech backend writing WAV files
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, request: &SpeechRequest, output: &Path) -> Result<()>;
}

/// Build the configured backend
pub fn build(config: &RunConfig) -> Box<dyn SpeechSynthesizer> {
    match config.engines.speech {
        SpeechEngine::Coqui => Box::new(CoquiTts::from_config(config)),
        SpeechEngine::Piper => Box::new(Piper::from_config(config)),
    }
}

/// Run one narration through `synthesizer` with logging and output checks
pub async fn narrate(synthesizer: &dyn SpeechSynthesizer, request: &SpeechRequest, output: &Path) -> Result<()> {
    if request.text.trim().is_empty() {
        return Err(SpeechError::EmptyText.into());
    }

    let started = Instant::now();
    info!(
        "📝 Narration text: {} characters, {} words",
        request.char_count(),
        request.word_count()
    );
    info!("🔊 Synthesizing with {}...", synthesizer.name());

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let result = synthesizer.synthesize(request, output).await;
    gpu::log_memory_usage("[TTS released]").await;
    result?;

    let size = match tokio::fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => meta.len(),
        _ => {
            return Err(SpeechError::NoOutput {
                path: output.display().to_string(),
            }
            .into())
        }
    };

    info!("✓ Audio generated");
    info!("  ├─ File: {}", output.display());
    info!("  ├─ Size: {:.2} MB", size as f64 / 1024.0 / 1024.0);
    info!("  └─ Synthesis time: {}", format_duration(started.elapsed().as_secs_f64()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct WritesBytes {
        bytes: &'static [u8],
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for WritesBytes {
        fn name(&self) -> &str {
            "fake"
        }

        async fn synthesize(&self, request: &SpeechRequest, output: &Path) -> Result<()> {
            self.seen.lock().unwrap().push(request.text.clone());
            tokio::fs::write(output, self.bytes).await?;
            Ok(())
        }
    }

    fn request(text: &str) -> SpeechRequest {
        SpeechRequest {
            text: text.to_string(),
            language: "pt".to_string(),
            voice: Voice::Named("Ana Florence".to_string()),
        }
    }

    #[test]
    fn test_voice_falls_back_to_default_speaker() {
        let dir = tempdir().unwrap();
        let mut audio = AudioConfig::default();

        audio.voice_clone_wav = Some(dir.path().join("missing.wav"));
        assert_eq!(Voice::from_config(&audio), Voice::Named("Ana Florence".to_string()));

        let sample = dir.path().join("me.wav");
        std::fs::write(&sample, b"RIFF").unwrap();
        audio.voice_clone_wav = Some(sample.clone());
        assert_eq!(Voice::from_config(&audio), Voice::Clone(sample));
    }

    #[test]
    fn test_request_counts() {
        let req = request("Olá mundo, tudo bem?");
        assert_eq!(req.word_count(), 4);
        assert_eq!(req.char_count(), 20);
    }

    #[tokio::test]
    async fn test_narrate_writes_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("nested/story_audio.wav");
        let synth = WritesBytes {
            bytes: b"RIFFdata",
            seen: Mutex::new(Vec::new()),
        };

        narrate(&synth, &request("uma frase"), &output).await.unwrap();
        assert!(output.exists());
        assert_eq!(synth.seen.lock().unwrap().as_slice(), ["uma frase"]);
    }

    #[tokio::test]
    async fn test_narrate_rejects_empty_text_and_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("a.wav");
        let synth = WritesBytes {
            bytes: b"",
            seen: Mutex::new(Vec::new()),
        };

        assert!(matches!(
            narrate(&synth, &request("   "), &output).await,
            Err(PipelineError::Speech(SpeechError::EmptyText))
        ));
        assert!(synth.seen.lock().unwrap().is_empty());

        assert!(matches!(
            narrate(&synth, &request("texto"), &output).await,
            Err(PipelineError::Speech(SpeechError::NoOutput { .. }))
        ));
    }

    #[test]
    fn test_build_picks_backend() {
        let mut config = RunConfig::default();
        assert_eq!(build(&config).name(), "Coqui TTS");
        config.engines.speech = SpeechEngine::Piper;
        assert_eq!(build(&config).name(), "Piper");
    }
}
