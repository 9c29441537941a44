use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::engine;
use crate::error::{Result, SpeechError};
use crate::speech::{SpeechRequest, SpeechSynthesizer, Voice};

/// Piper: fast local TTS reading text on stdin
///
/// Piper voices are single-language models, so the request language is
/// implied by the model. Voice cloning is not supported.
pub struct Piper {
    binary: String,
    model: String,
}

impl Piper {
    pub fn new(binary: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.engines.piper_binary.clone(), config.models.tts.clone())
    }

    pub fn build_args(&self, request: &SpeechRequest, output: &Path) -> Vec<String> {
        let mut args = vec![
            "--model".to_string(),
            self.model.clone(),
            "--output_file".to_string(),
            output.display().to_string(),
        ];

        match &request.voice {
            Voice::Named(speaker) if speaker.parse::<u32>().is_ok() => {
                args.push("--speaker".to_string());
                args.push(speaker.clone());
            }
            Voice::Named(_) => {}
            Voice::Clone(sample) => {
                warn!("Piper cannot clone voices; ignoring {}", sample.display());
            }
        }

        args
    }
}

#[async_trait]
impl SpeechSynthesizer for Piper {
    fn name(&self) -> &str {
        "Piper"
    }

    async fn synthesize(&self, request: &SpeechRequest, output: &Path) -> Result<()> {
        let args = self.build_args(request, output);
        debug!("{} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| engine::spawn_error(&self.binary, e))?;

        let mut stdin = child.stdin.take().ok_or_else(|| SpeechError::SynthesisFailed {
            reason: "failed to open piper stdin".to_string(),
        })?;
        stdin.write_all(request.text.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        engine::check_output(&self.binary, output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(voice: Voice) -> SpeechRequest {
        SpeechRequest {
            text: "Olá".to_string(),
            language: "pt".to_string(),
            voice,
        }
    }

    #[test]
    fn test_numeric_speaker_is_passed() {
        let piper = Piper::new("piper", "pt_BR-faber-medium.onnx");
        let args = piper.build_args(&request(Voice::Named("3".into())), Path::new("o.wav"));
        assert_eq!(
            args,
            ["--model", "pt_BR-faber-medium.onnx", "--output_file", "o.wav", "--speaker", "3"]
        );
    }

    #[test]
    fn test_named_and_cloned_voices_are_ignored() {
        let piper = Piper::new("piper", "voice.onnx");
        let named = piper.build_args(&request(Voice::Named("Ana Florence".into())), Path::new("o.wav"));
        let cloned = piper.build_args(&request(Voice::Clone(PathBuf::from("me.wav"))), Path::new("o.wav"));
        assert_eq!(named.len(), 4);
        assert_eq!(cloned.len(), 4);
    }
}
