use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use tracing::{debug, info};

use crate::captions::transcript::{distribute_words, Segment, Transcript, Word};
use crate::captions::{Transcriber, TranscriptionTask};
use crate::config::RunConfig;
use crate::engine;
use crate::error::{CaptionError, Result};
use crate::gpu;
use crate::pipeline::format_duration;

/// whisper.cpp through `whisper-cli`
///
/// The media's audio is first extracted to 16 kHz mono PCM with ffmpeg,
/// then transcribed with full JSON output for token-level timestamps.
pub struct WhisperCli {
    binary: String,
    ffmpeg: String,
    model: PathBuf,
    use_gpu: bool,
}

impl WhisperCli {
    pub fn new(binary: impl Into<String>, ffmpeg: impl Into<String>, model: impl Into<PathBuf>, use_gpu: bool) -> Self {
        Self {
            binary: binary.into(),
            ffmpeg: ffmpeg.into(),
            model: model.into(),
            use_gpu,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.engines.whisper_binary.clone(),
            config.engines.ffmpeg_binary.clone(),
            &config.models.whisper,
            config.engines.use_gpu,
        )
    }

    fn extract_args(media: &Path, wav: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            media.display().to_string(),
            "-vn".to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
            "-y".to_string(),
            wav.display().to_string(),
        ]
    }

    fn whisper_args(&self, wav: &Path, output_base: &Path, task: TranscriptionTask) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.model.display().to_string(),
            "-f".to_string(),
            wav.display().to_string(),
            "-l".to_string(),
            "auto".to_string(),
            "-ojf".to_string(),
            "-of".to_string(),
            output_base.display().to_string(),
        ];

        if task == TranscriptionTask::Translate {
            args.push("-tr".to_string());
        }

        if !self.use_gpu {
            args.push("-ng".to_string());
        }

        args
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    fn name(&self) -> &str {
        "whisper.cpp"
    }

    async fn transcribe(&self, media: &Path, task: TranscriptionTask) -> Result<Transcript> {
        let started = Instant::now();
        if !self.model.is_file() {
            return Err(CaptionError::TranscriptionFailed {
                reason: format!("Whisper model not found: {}", self.model.display()),
            }
            .into());
        }

        let scratch = tempfile::tempdir()?;
        let wav = scratch.path().join("audio.wav");
        let output_base = scratch.path().join("transcript");

        debug!("Extracting audio from {}", media.display());
        engine::run(&self.ffmpeg, Self::extract_args(media, &wav)).await?;

        info!("Transcribing audio with word timestamps...");
        engine::run(&self.binary, self.whisper_args(&wav, &output_base, task)).await?;

        let json_path = output_base.with_extension("json");
        let json = tokio::fs::read(&json_path)
            .await
            .map_err(|e| CaptionError::TranscriptionFailed {
                reason: format!("no transcript at {}: {}", json_path.display(), e),
            })?;

        let transcript = parse_full_json(&json)?;
        info!(
            "✓ Transcription complete: {} words detected in {}",
            transcript.word_count(),
            format_duration(started.elapsed().as_secs_f64())
        );
        Ok(transcript)
    }

    async fn release(&self) {
        gpu::log_memory_usage("[Whisper released]").await;
    }
}

#[derive(Debug, Deserialize)]
struct FullJson {
    #[serde(default)]
    transcription: Vec<JsonSegment>,
}

#[derive(Debug, Deserialize)]
struct JsonSegment {
    offsets: Offsets,
    #[serde(default, deserialize_with = "raw_text")]
    text: Vec<u8>,
    #[serde(default)]
    tokens: Vec<JsonToken>,
}

/// Token text as whisper.cpp wrote it; a multibyte character may be
/// split across neighbouring tokens, so it is not always valid UTF-8
#[derive(Debug, Deserialize)]
struct JsonToken {
    #[serde(deserialize_with = "raw_text")]
    text: Vec<u8>,
    offsets: Option<Offsets>,
}

struct RawTextVisitor;

impl<'de> Visitor<'de> for RawTextVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Vec<u8>, E> {
        Ok(value.as_bytes().to_vec())
    }

    fn visit_bytes<E: de::Error>(self, value: &[u8]) -> std::result::Result<Vec<u8>, E> {
        Ok(value.to_vec())
    }

    fn visit_byte_buf<E: de::Error>(self, value: Vec<u8>) -> std::result::Result<Vec<u8>, E> {
        Ok(value)
    }
}

/// Read a JSON string without UTF-8 validation
fn raw_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
    deserializer.deserialize_bytes(RawTextVisitor)
}

/// Milliseconds
#[derive(Debug, Clone, Copy, Deserialize)]
struct Offsets {
    from: i64,
    to: i64,
}

fn seconds(ms: i64) -> f64 {
    ms.max(0) as f64 / 1000.0
}

/// Control tokens such as `[_BEG_]` or `[_TT_150]`
fn is_special(token: &[u8]) -> bool {
    let token = token.trim_ascii();
    token.starts_with(b"[_") && token.ends_with(b"]")
}

/// A word while its bytes are still being collected
struct PendingWord {
    bytes: Vec<u8>,
    start: f64,
    end: f64,
}

impl PendingWord {
    fn finish(self) -> Word {
        Word::new(String::from_utf8_lossy(&self.bytes), self.start, self.end)
    }
}

/// Join sub-word tokens into words; a leading space starts a new word.
/// Bytes are joined before decoding so split characters come back whole.
fn merge_tokens(tokens: &[JsonToken]) -> Vec<Word> {
    let mut words: Vec<PendingWord> = Vec::new();
    let mut break_pending = true;

    for token in tokens {
        if is_special(&token.text) {
            continue;
        }

        let Some(offsets) = token.offsets else { continue };
        let piece = token.text.trim_ascii();
        if piece.is_empty() {
            break_pending = true;
            continue;
        }

        let starts_word = break_pending || token.text.first().is_some_and(u8::is_ascii_whitespace);
        match words.last_mut() {
            Some(word) if !starts_word => {
                word.bytes.extend_from_slice(piece);
                word.end = seconds(offsets.to);
            }
            _ => words.push(PendingWord {
                bytes: piece.to_vec(),
                start: seconds(offsets.from),
                end: seconds(offsets.to),
            }),
        }
        break_pending = false;
    }

    words.into_iter().map(PendingWord::finish).collect()
}

/// Parse whisper.cpp `-ojf` output into a transcript
pub fn parse_full_json(json: &[u8]) -> Result<Transcript> {
    let parsed: FullJson = serde_json::from_slice(json).map_err(|e| CaptionError::TranscriptionFailed {
        reason: format!("unreadable whisper output: {}", e),
    })?;

    let segments = parsed
        .transcription
        .into_iter()
        .map(|segment| {
            let start = seconds(segment.offsets.from);
            let end = seconds(segment.offsets.to);
            let text = String::from_utf8_lossy(&segment.text).trim().to_string();
            let mut words = merge_tokens(&segment.tokens);
            if words.is_empty() {
                words = distribute_words(&text, start, end);
            }
            Segment { start, end, text, words }
        })
        .collect();

    Ok(Transcript::new(segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "systeminfo": "AVX = 1",
        "result": {"language": "pt"},
        "transcription": [
            {
                "timestamps": {"from": "00:00:00,000", "to": "00:00:02,000"},
                "offsets": {"from": 0, "to": 2000},
                "text": " Hello, unbelievable world",
                "tokens": [
                    {"text": "[_BEG_]", "offsets": {"from": 0, "to": 0}, "id": 50364, "p": 0.9},
                    {"text": " Hello", "offsets": {"from": 0, "to": 400}, "id": 1, "p": 0.9},
                    {"text": ",", "offsets": {"from": 400, "to": 450}, "id": 2, "p": 0.9},
                    {"text": " un", "offsets": {"from": 500, "to": 700}, "id": 3, "p": 0.9},
                    {"text": "believ", "offsets": {"from": 700, "to": 900}, "id": 4, "p": 0.9},
                    {"text": "able", "offsets": {"from": 900, "to": 1200}, "id": 5, "p": 0.9},
                    {"text": " world", "offsets": {"from": 1300, "to": 2000}, "id": 6, "p": 0.9},
                    {"text": "[_TT_100]", "offsets": {"from": 2000, "to": 2000}, "id": 50464, "p": 0.9}
                ]
            },
            {
                "timestamps": {"from": "00:00:02,000", "to": "00:00:04,000"},
                "offsets": {"from": 2000, "to": 4000},
                "text": " ab abcd ab"
            }
        ]
    }"#;

    #[test]
    fn test_tokens_merge_into_words() {
        let transcript = parse_full_json(SAMPLE.as_bytes()).unwrap();
        let words = &transcript.segments[0].words;

        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello,", "unbelievable", "world"]);
        assert_eq!(words[1].start, 0.5);
        assert_eq!(words[1].end, 1.2);
        assert_eq!(transcript.segments[0].text, "Hello, unbelievable world");
    }

    #[test]
    fn test_segment_without_tokens_gets_distributed_words() {
        let transcript = parse_full_json(SAMPLE.as_bytes()).unwrap();
        let words = &transcript.segments[1].words;
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].start, 2.0);
        assert!((words[1].end - 3.5).abs() < 1e-9);
        assert_eq!(transcript.word_count(), 6);
    }

    #[test]
    fn test_invalid_json() {
        assert!(parse_full_json(b"not json").is_err());
        assert!(parse_full_json(b"{}").unwrap().segments.is_empty());
    }

    #[test]
    fn test_whisper_args() {
        let whisper = WhisperCli::new("whisper-cli", "ffmpeg", "models/ggml-small.bin", true);
        let args = whisper.whisper_args(Path::new("a.wav"), Path::new("/tmp/t"), TranscriptionTask::Translate);
        assert_eq!(
            args,
            ["-m", "models/ggml-small.bin", "-f", "a.wav", "-l", "auto", "-ojf", "-of", "/tmp/t", "-tr"]
        );

        let cpu = WhisperCli::new("whisper-cli", "ffmpeg", "m.bin", false);
        let args = cpu.whisper_args(Path::new("a.wav"), Path::new("t"), TranscriptionTask::Transcribe);
        assert!(!args.contains(&"-tr".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-ng"));
    }

    #[test]
    fn test_extract_args_resample_to_mono_16k() {
        let args = WhisperCli::extract_args(Path::new("in.mp4"), Path::new("a.wav"));
        let joined = args.join(" ");
        assert!(joined.contains("-ar 16000 -ac 1"));
        assert!(joined.ends_with("-y a.wav"));
    }

    #[test]
    fn test_split_multibyte_tokens_rejoin() {
        let mut json = br#"{"transcription": [{"offsets": {"from": 0, "to": 1000}, "text": " cora"#.to_vec();
        json.extend_from_slice(b"\xC3\xA7\xC3\xA3o");
        json.extend_from_slice(br#"", "tokens": [{"text": " cora", "offsets": {"from": 0, "to": 300}}, {"text": ""#);
        json.push(0xC3);
        json.extend_from_slice(br#"", "offsets": {"from": 300, "to": 500}}, {"text": ""#);
        json.extend_from_slice(b"\xA7\xC3\xA3o");
        json.extend_from_slice(br#"", "offsets": {"from": 500, "to": 1000}}]}]}"#);
        assert!(std::str::from_utf8(&json).is_err());

        let transcript = parse_full_json(&json).unwrap();
        assert_eq!(transcript.segments[0].words, vec![Word::new("coração", 0.0, 1.0)]);
        assert_eq!(transcript.segments[0].text, "coração");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_transcribe_tolerates_split_utf8_in_output() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("ggml-small.bin");
        std::fs::write(&model, b"model").unwrap();

        let ffmpeg = engine::write_test_script(dir.path(), "ffmpeg", "exit 0");
        let whisper = engine::write_test_script(
            dir.path(),
            "whisper-cli",
            r#"while [ $# -gt 0 ]; do
    if [ "$1" = "-of" ]; then out="$2"; fi
    shift
done
printf '{"transcription":[{"offsets":{"from":0,"to":1000},"text":" cora\303\247\303\243o","tokens":[{"text":" cora","offsets":{"from":0,"to":300}},{"text":"\303","offsets":{"from":300,"to":500}},{"text":"\247\303\243o","offsets":{"from":500,"to":1000}}]}]}' > "$out.json""#,
        );

        let cli = WhisperCli::new(whisper.display().to_string(), ffmpeg.display().to_string(), &model, false);
        let transcript = cli
            .transcribe(&dir.path().join("in.mp4"), TranscriptionTask::Transcribe)
            .await
            .unwrap();

        let texts: Vec<&str> = transcript.segments[0].words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["coração"]);
    }

    #[tokio::test]
    async fn test_missing_model_fails_fast() {
        let whisper = WhisperCli::new("whisper-cli", "ffmpeg", "/nonexistent/model.bin", false);
        let result = whisper.transcribe(Path::new("in.mp4"), TranscriptionTask::Transcribe).await;
        assert!(result.is_err());
    }
}
