use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::config::RunConfig;
use crate::engine;
use crate::error::Result;
use crate::speech::{SpeechRequest, SpeechSynthesizer, Voice};

/// Coqui TTS through its `tts` command-line front end
///
/// Multilingual XTTS models take the language and either a reference
/// recording (`--speaker_wav`) or a built-in speaker name (`--speaker_idx`).
pub struct CoquiTts {
    binary: String,
    model: String,
    use_cuda: bool,
}

impl CoquiTts {
    pub fn new(binary: impl Into<String>, model: impl Into<String>, use_cuda: bool) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            use_cuda,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.engines.tts_binary.clone(),
            config.models.tts.clone(),
            config.engines.use_gpu,
        )
    }

    pub fn build_args(&self, request: &SpeechRequest, output: &Path) -> Vec<String> {
        let mut args = vec![
            "--text".to_string(),
            request.text.clone(),
            "--model_name".to_string(),
            self.model.clone(),
            "--language_idx".to_string(),
            request.language.clone(),
        ];

        match &request.voice {
            Voice::Clone(sample) => {
                args.push("--speaker_wav".to_string());
                args.push(sample.display().to_string());
            }
            Voice::Named(speaker) => {
                args.push("--speaker_idx".to_string());
                args.push(speaker.clone());
            }
        }

        args.push("--out_path".to_string());
        args.push(output.display().to_string());

        if self.use_cuda {
            args.push("--use_cuda".to_string());
            args.push("true".to_string());
        }

        args
    }
}

#[async_trait]
impl SpeechSynthesizer for CoquiTts {
    fn name(&self) -> &str {
        "Coqui TTS"
    }

    async fn synthesize(&self, request: &SpeechRequest, output: &Path) -> Result<()> {
        info!("🔧 TTS model: {} ({})", self.model, if self.use_cuda { "CUDA" } else { "CPU" });
        engine::run(&self.binary, self.build_args(request, output)).await?;
        Ok(())
    }
}
