use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{AudioError, Result};

/// Basic facts about an audio file
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub path: PathBuf,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Duration in seconds
    pub duration: f64,

    /// Lower-case file extension
    pub format: String,
}

/// Reads audio file headers, supporting WAV and the formats Symphonia decodes
pub struct AudioLoader;

impl AudioLoader {
    /// Read sample rate, channels and duration of an audio file
    pub async fn inspect<P: AsRef<Path>>(path: P) -> Result<AudioInfo> {
        let path = path.as_ref().to_path_buf();
        let extension = Self::detect_format(&path).unwrap_or_default();

        let file_path = path.clone();
        let info = match extension.as_str() {
            "wav" => tokio::task::spawn_blocking(move || Self::read_wav_header(&file_path)).await,
            "mp3" | "flac" | "ogg" | "m4a" | "aac" => {
                tokio::task::spawn_blocking(move || Self::read_with_symphonia(&file_path)).await
            }
            _ => return Err(AudioError::UnsupportedFormat { format: extension }.into()),
        };

        info.map_err(|_| AudioError::LoadFailed {
            path: path.display().to_string(),
        })?
    }

    /// Duration in seconds; zero-length audio is an error
    pub async fn duration<P: AsRef<Path>>(path: P) -> Result<f64> {
        let info = Self::inspect(path).await?;
        if info.duration <= 0.0 {
            return Err(AudioError::InvalidParameters {
                details: format!("{} has no audio", info.path.display()),
            }
            .into());
        }
        Ok(info.duration)
    }

    /// WAV header via hound (most reliable for WAV)
    fn read_wav_header(path: &Path) -> Result<AudioInfo> {
        let reader = hound::WavReader::open(path).map_err(|_| AudioError::LoadFailed {
            path: path.display().to_string(),
        })?;

        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(AudioError::InvalidParameters {
                details: "WAV header has a zero sample rate".to_string(),
            }
            .into());
        }

        // hound counts frames (samples per channel)
        let duration = reader.duration() as f64 / spec.sample_rate as f64;

        Ok(AudioInfo {
            path: path.to_path_buf(),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            duration,
            format: "wav".to_string(),
        })
    }

    /// Compressed formats via Symphonia
    ///
    /// Uses the container's frame count when present and falls back to
    /// decoding every packet otherwise (VBR MP3 without a Xing header).
    fn read_with_symphonia(path: &Path) -> Result<AudioInfo> {
        let load_failed = || AudioError::LoadFailed {
            path: path.display().to_string(),
        };

        let file = File::open(path).map_err(|_| load_failed())?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let detected = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|_| load_failed())?;
        let mut format = detected.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(load_failed)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params.sample_rate.ok_or_else(|| AudioError::InvalidParameters {
            details: "No sample rate found".to_string(),
        })?;
        let channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(1);

        let frames = match codec_params.n_frames {
            Some(n) => n,
            None => {
                let mut decoder = symphonia::default::get_codecs()
                    .make(&codec_params, &DecoderOptions::default())
                    .map_err(|_| load_failed())?;

                let mut counted: u64 = 0;
                loop {
                    let packet = match format.next_packet() {
                        Ok(packet) => packet,
                        Err(SymphoniaError::ResetRequired) => {
                            decoder.reset();
                            continue;
                        }
                        Err(_) => break, // end of stream
                    };

                    if packet.track_id() != track_id {
                        continue;
                    }

                    match decoder.decode(&packet) {
                        Ok(decoded) => counted += decoded.frames() as u64,
                        Err(SymphoniaError::DecodeError(_)) => continue,
                        Err(_) => break,
                    }
                }
                counted
            }
        };

        Ok(AudioInfo {
            path: path.to_path_buf(),
            sample_rate,
            channels,
            duration: frames as f64 / sample_rate as f64,
            format: Self::detect_format(path).unwrap_or_else(|| "unknown".to_string()),
        })
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file format is supported
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}
