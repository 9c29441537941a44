use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::audio::AudioLoader;
use crate::engine;
use crate::error::{EngineError, Result, VideoError};
use crate::video::renderer::SlideshowRenderer;
use crate::video::types::VideoParams;

/// Represents an encoded video output
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub duration: f64,
    pub frame_count: usize,
    pub file_size: u64,
}

/// Audio tracks and target of one encode
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub narration: PathBuf,
    pub music: Option<PathBuf>,
    pub music_volume: f32,
    /// Narration length; the output is trimmed to it
    pub duration: f64,
    pub output: PathBuf,
}

/// Streams rendered frames into ffmpeg as raw RGB24
pub struct VideoEncoder {
    ffmpeg: String,
    params: VideoParams,
}

impl VideoEncoder {
    pub fn new(ffmpeg: impl Into<String>, params: VideoParams) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            params,
        }
    }

    pub async fn check_ffmpeg_available(&self) -> bool {
        engine::is_available(&self.ffmpeg, "-version").await
    }

    /// Frames rendered per blocking batch
    fn batch_size(&self) -> usize {
        (self.params.threads.max(1) * 2).max(8)
    }

    /// ffmpeg arguments for `job`
    ///
    /// Input 0 is the frame pipe, input 1 the narration and input 2 the
    /// looped music when present.
    pub fn build_args(&self, job: &EncodeJob) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            format!("{}x{}", self.params.width(), self.params.height()),
            "-r".into(),
            self.params.fps.to_string(),
            "-i".into(),
            "pipe:0".into(),
            "-i".into(),
            job.narration.display().to_string(),
        ];

        match &job.music {
            Some(music) => {
                args.extend([
                    "-stream_loop".into(),
                    "-1".into(),
                    "-i".into(),
                    music.display().to_string(),
                    "-filter_complex".into(),
                    format!(
                        "[2:a]volume={:.3}[m];[1:a][m]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[a]",
                        job.music_volume
                    ),
                    "-map".into(),
                    "0:v".into(),
                    "-map".into(),
                    "[a]".into(),
                ]);
            }
            None => {
                args.extend(["-map".into(), "0:v".into(), "-map".into(), "1:a".into()]);
            }
        }

        args.extend([
            "-c:v".into(),
            self.params.codec.clone(),
            "-preset".into(),
            self.params.preset.clone(),
            "-crf".into(),
            self.params.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-threads".into(),
            self.params.threads.to_string(),
            "-t".into(),
            format!("{:.3}", job.duration),
            "-movflags".into(),
            "+faststart".into(),
            "-y".into(),
            job.output.display().to_string(),
        ]);

        args
    }

    /// Render every frame of `renderer` and encode it with the job's audio
    pub async fn encode(&self, renderer: Arc<SlideshowRenderer>, job: &EncodeJob) -> Result<EncodedVideo> {
        let started = Instant::now();
        let total_frames = renderer.frame_count();
        if total_frames == 0 {
            return Err(VideoError::InvalidParameters {
                details: "nothing to encode".to_string(),
            }
            .into());
        }

        let args = self.build_args(job);
        debug!("{} {}", self.ffmpeg, args.join(" "));

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| engine::spawn_error(&self.ffmpeg, e))?;

        let mut stdin = child.stdin.take().ok_or_else(|| VideoError::EncodingFailed {
            reason: "failed to open ffmpeg stdin".to_string(),
        })?;

        // Drain stderr so ffmpeg never blocks on a full pipe
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                buf
            })
        });

        let batch = self.batch_size();
        let report_every = (total_frames / 10).max(1);
        let mut written = 0usize;
        let mut pipe_closed = false;

        while written < total_frames && !pipe_closed {
            let end = (written + batch).min(total_frames);
            let batch_renderer = Arc::clone(&renderer);
            let range = written..end;

            let frames = tokio::task::spawn_blocking(move || batch_renderer.render_range(range))
                .await
                .map_err(|e| VideoError::FrameProcessingFailed {
                    reason: e.to_string(),
                })?;

            for frame in &frames {
                if let Err(e) = stdin.write_all(frame.as_rgb_bytes()).await {
                    // ffmpeg exited early; its status tells us why
                    warn!("ffmpeg stopped reading frames: {}", e);
                    pipe_closed = true;
                    break;
                }
                written += 1;

                if written % report_every == 0 {
                    debug!(
                        "   Encoding: {}/{} frames ({:.0}%)",
                        written,
                        total_frames,
                        written as f64 / total_frames as f64 * 100.0
                    );
                }
            }
        }

        // Closing stdin signals end of stream
        drop(stdin);

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if !status.success() {
            return Err(EngineError::Failed {
                program: self.ffmpeg.clone(),
                status: status.to_string(),
                stderr_tail: engine::stderr_tail(&stderr, engine::STDERR_TAIL_LINES),
            }
            .into());
        }

        if written < total_frames {
            return Err(VideoError::EncodingFailed {
                reason: format!("only {} of {} frames were written", written, total_frames),
            }
            .into());
        }

        let metadata = tokio::fs::metadata(&job.output).await?;
        let encoded = EncodedVideo {
            path: job.output.clone(),
            duration: job.duration,
            frame_count: written,
            file_size: metadata.len(),
        };

        info!(
            "   Encoded {} frames in {:.1}s ({:.1} MB)",
            encoded.frame_count,
            started.elapsed().as_secs_f64(),
            encoded.file_size as f64 / 1024.0 / 1024.0
        );

        Ok(encoded)
    }
}

/// How the background track is fitted under the narration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicFit {
    /// Shorter than the narration, repeated until it ends
    Loop,
    /// At least as long as the narration, cut at its end
    Trim,
}

impl MusicFit {
    pub fn for_lengths(music: f64, narration: f64) -> Self {
        if music < narration {
            MusicFit::Loop
        } else {
            MusicFit::Trim
        }
    }
}

/// Use `music` only when it is configured, present and decodable
pub async fn resolve_music(music: Option<&Path>, narration_duration: f64) -> Option<PathBuf> {
    let path = music?;
    if !path.is_file() {
        warn!("Background music not found: {} (using narration only)", path.display());
        return None;
    }

    let length = match AudioLoader::duration(path).await {
        Ok(length) => length,
        Err(e) => {
            warn!("Background music unreadable: {} (using narration only)", e);
            return None;
        }
    };

    match MusicFit::for_lengths(length, narration_duration) {
        MusicFit::Loop => info!(
            "   Looping {:.1}s of music under {:.1}s of narration",
            length, narration_duration
        ),
        MusicFit::Trim => info!(
            "   Trimming {:.1}s of music to {:.1}s of narration",
            length, narration_duration
        ),
    }

    Some(path.to_path_buf())
}
