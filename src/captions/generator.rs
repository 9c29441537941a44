use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::captions::ass::{AssDocument, CaptionStyle};
use crate::captions::burn::{FfmpegBurner, SubtitleBurner};
use crate::captions::srt::SrtDocument;
use crate::captions::whisper::WhisperCli;
use crate::captions::{Captioner, Transcriber, TranscriptionTask};
use crate::config::RunConfig;
use crate::error::{CaptionError, Result};
use crate::logging::log_separator;
use crate::pipeline::format_duration;

/// What one captioning run produced
#[derive(Debug, Clone)]
pub struct CaptionReport {
    pub output: PathBuf,
    pub word_count: usize,
    pub event_count: usize,
    pub file_size: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct BatchCaptionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Transcribe, style and burn captions into finished videos
pub struct CaptionGenerator {
    transcriber: Box<dyn Transcriber>,
    burner: Box<dyn SubtitleBurner>,
    style: CaptionStyle,
    keep_ass_file: bool,
    export_srt: bool,
}

impl CaptionGenerator {
    pub fn new(transcriber: Box<dyn Transcriber>, burner: Box<dyn SubtitleBurner>, style: CaptionStyle) -> Self {
        Self {
            transcriber,
            burner,
            style,
            keep_ass_file: false,
            export_srt: false,
        }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let style = CaptionStyle::from_config(&config.captions, config.video.params.resolution)?;
        Ok(Self::new(
            Box::new(WhisperCli::from_config(config)),
            Box::new(FfmpegBurner::new(
                config.engines.ffmpeg_binary.clone(),
                config.captions.fonts_dir.clone(),
            )),
            style,
        )
        .keep_ass_file(config.captions.keep_ass_file)
        .export_srt(config.captions.export_srt))
    }

    pub fn keep_ass_file(mut self, keep: bool) -> Self {
        self.keep_ass_file = keep;
        self
    }

    pub fn export_srt(mut self, export: bool) -> Self {
        self.export_srt = export;
        self
    }

    /// Caption `input` into `output`
    ///
    /// The transcriber is released afterwards whether or not this succeeds.
    pub async fn generate(&self, input: &Path, output: &Path, task: TranscriptionTask) -> Result<CaptionReport> {
        let started = Instant::now();
        log_separator(Some("CAPTION GENERATION"));

        match task {
            TranscriptionTask::Translate => info!("Translation mode (audio → English captions)"),
            TranscriptionTask::Transcribe => info!("Transcription mode (captions in the spoken language)"),
        }

        let result = self.run(input, output, task, started).await;
        self.transcriber.release().await;

        match &result {
            Ok(report) => {
                info!("");
                info!("✅ CAPTIONS GENERATED");
                info!("  ├─ Final file: {}", report.output.display());
                info!("  ├─ Size: {:.2} MB", report.file_size as f64 / 1024.0 / 1024.0);
                info!("  └─ Total time: {}", format_duration(report.elapsed.as_secs_f64()));
            }
            Err(e) => {
                error!(
                    "✗ Captioning failed after {}: {}",
                    format_duration(started.elapsed().as_secs_f64()),
                    e.user_message()
                );
            }
        }

        result
    }

    async fn run(&self, input: &Path, output: &Path, task: TranscriptionTask, started: Instant) -> Result<CaptionReport> {
        if !input.is_file() {
            return Err(CaptionError::TranscriptionFailed {
                reason: format!("input video not found: {}", input.display()),
            }
            .into());
        }

        let transcript = self.transcriber.transcribe(input, task).await?;
        if transcript.is_empty() {
            warn!("No speech detected in {}; the video will have no captions", input.display());
        }

        let document = AssDocument::from_transcript(&transcript, &self.style);
        let ass_file = tempfile::Builder::new()
            .prefix("reelsmith_captions_")
            .suffix(".ass")
            .tempfile()?;
        document.write_to(ass_file.path())?;
        info!("✓ ASS file generated with {} captions", document.event_count());

        self.burner.burn(input, ass_file.path(), output).await?;

        if self.keep_ass_file {
            let kept = output.with_extension("ass");
            tokio::fs::copy(ass_file.path(), &kept).await?;
            info!("ASS file saved: {}", kept.display());
        } else {
            debug!("Temporary ASS file removed");
        }

        if self.export_srt {
            let srt_path = output.with_extension("srt");
            SrtDocument::from_transcript(&transcript, self.style.max_words_per_line).write_to(&srt_path)?;
            info!("SRT file saved: {}", srt_path.display());
        }

        let file_size = tokio::fs::metadata(output).await?.len();

        Ok(CaptionReport {
            output: output.to_path_buf(),
            word_count: transcript.word_count(),
            event_count: document.event_count(),
            file_size,
            elapsed: started.elapsed(),
        })
    }

    /// Caption several videos in sequence, counting outcomes
    pub async fn process_batch(&self, videos: &[(PathBuf, PathBuf)], task: TranscriptionTask) -> BatchCaptionSummary {
        let started = Instant::now();
        let mut summary = BatchCaptionSummary {
            total: videos.len(),
            ..BatchCaptionSummary::default()
        };

        info!("Starting batch captioning: {} videos", videos.len());

        for (i, (input, output)) in videos.iter().enumerate() {
            log_separator(Some(&format!("Video {}/{}", i + 1, videos.len())));
            match self.generate(input, output, task).await {
                Ok(_) => summary.succeeded += 1,
                Err(_) => summary.failed += 1,
            }
        }

        summary.elapsed = started.elapsed();

        log_separator(Some("BATCH CAPTIONING SUMMARY"));
        info!("Total processed: {}", summary.total);
        info!("✅ Succeeded: {}", summary.succeeded);
        info!("❌ Failed: {}", summary.failed);
        info!("⏱️  Total time: {}", format_duration(summary.elapsed.as_secs_f64()));

        summary
    }
}

#[async_trait]
impl Captioner for CaptionGenerator {
    async fn caption(&self, input: &Path, output: &Path, task: TranscriptionTask) -> Result<()> {
        self.generate(input, output, task).await.map(|_| ())
    }
}
