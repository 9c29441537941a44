use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::captions::{CaptionGenerator, Captioner, TranscriptionTask};
use crate::config::RunConfig;
use crate::error::Result;
use crate::gpu;
use crate::imaging::{ImageStage, StableDiffusionCli};
use crate::logging::log_separator;
use crate::pipeline::summary::{format_duration, RunSummary, StageStats, StageTimings, StoryFailure};
use crate::speech::{self, SpeechRequest, SpeechSynthesizer};
use crate::story::{Story, StoryPaths};
use crate::video::{Assembler, EncodedVideo, SlideshowAssembler};

/// The swappable parts of a run
pub struct Stages {
    pub speech: Box<dyn SpeechSynthesizer>,
    pub images: ImageStage,
    pub assembler: Box<dyn Assembler>,
    /// `None` when captions are disabled; the base video becomes the final one
    pub captioner: Option<Box<dyn Captioner>>,
}

/// Everything one story produced
#[derive(Debug, Clone)]
pub struct StoryOutput {
    pub id: String,
    pub narration: PathBuf,
    pub images: Vec<PathBuf>,
    pub video: EncodedVideo,
    pub final_video: PathBuf,
    pub timings: StageTimings,
}

/// Runs stories through speech, images, assembly and captions
pub struct VideoPipeline {
    config: RunConfig,
    stages: Stages,
}

impl VideoPipeline {
    pub fn new(config: RunConfig, stages: Stages) -> Self {
        Self { config, stages }
    }

    /// Wire up the command-line engines named in `config`
    pub fn from_config(config: RunConfig) -> Result<Self> {
        let captioner: Option<Box<dyn Captioner>> = if config.captions.enabled {
            Some(Box::new(CaptionGenerator::from_config(&config)?))
        } else {
            None
        };

        let stages = Stages {
            speech: speech::build(&config),
            images: ImageStage::new(
                Box::new(StableDiffusionCli::from_config(&config)),
                config.images.clone(),
            ),
            assembler: Box::new(SlideshowAssembler::from_config(&config)),
            captioner,
        };

        Ok(Self::new(config, stages))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Produce one story. `index` is 0-based.
    pub async fn run_story(&self, index: usize, story: &Story) -> Result<StoryOutput> {
        let mut timings = StageTimings::default();
        self.produce(index, story, &mut timings).await
    }

    /// Stage timings are written into `timings` as each stage finishes,
    /// so a failed story still reports what it got through.
    async fn produce(&self, index: usize, story: &Story, timings: &mut StageTimings) -> Result<StoryOutput> {
        story.validate(index)?;

        let id = story.video_id(index);
        let paths = StoryPaths::new(&self.config.output_dir, &id);
        let with_captions = self.stages.captioner.is_some();
        let total_steps = if with_captions { 4 } else { 3 };

        // Step 1: narration
        info!("🎙️ Step 1/{}: Generating narration...", total_steps);
        let started = Instant::now();
        let request = SpeechRequest::new(story.narration.clone(), &self.config.audio);
        speech::narrate(self.stages.speech.as_ref(), &request, &paths.narration).await?;
        timings.audio = Some(started.elapsed().as_secs_f64());

        // Step 2: scene images
        info!("🎨 Step 2/{}: Generating {} scene images...", total_steps, story.scenes.len());
        let started = Instant::now();
        let images = self.stages.images.generate_scenes(&story.scenes, &paths.images_dir).await?;
        let elapsed = started.elapsed().as_secs_f64();
        timings.images = Some(elapsed);
        info!(
            "   ✅ {} images in {} ({} per image)",
            images.len(),
            format_duration(elapsed),
            format_duration(elapsed / images.len() as f64)
        );
        gpu::log_memory_usage("[Images done]").await;

        // Step 3: slideshow
        info!("🎬 Step 3/{}: Assembling video...", total_steps);
        let started = Instant::now();
        let video = self
            .stages
            .assembler
            .assemble(&images, &paths.narration, &paths.base_video)
            .await?;
        timings.assembly = Some(started.elapsed().as_secs_f64());

        // Step 4: captions
        match &self.stages.captioner {
            Some(captioner) => {
                info!("💬 Step 4/{}: Adding captions...", total_steps);
                let started = Instant::now();
                let task = TranscriptionTask::from_translate(story.wants_translation());
                captioner.caption(&paths.base_video, &paths.final_video, task).await?;
                timings.captions = Some(started.elapsed().as_secs_f64());
            }
            None => {
                tokio::fs::copy(&paths.base_video, &paths.final_video).await?;
                info!("Captions disabled, base video copied to {}", paths.final_video.display());
            }
        }

        Ok(StoryOutput {
            id,
            narration: paths.narration,
            images,
            video,
            final_video: paths.final_video,
            timings: timings.clone(),
        })
    }

    /// Produce every story in order. A failed story is logged and skipped.
    pub async fn run_batch(&self, stories: &[Story]) -> RunSummary {
        let batch_started = Instant::now();
        let mut summary = RunSummary::new(stories.len(), &self.config.output_dir);

        if let Err(e) = tokio::fs::create_dir_all(&self.config.output_dir).await {
            warn!(
                "Could not create output directory {}: {}",
                self.config.output_dir.display(),
                e
            );
        }

        log_separator(Some("STARTING BATCH"));
        info!("📚 {} stories to process", stories.len());
        info!("📁 Output: {}", self.config.output_dir.display());
        gpu::log_memory_usage("[Start]").await;

        for (index, story) in stories.iter().enumerate() {
            let position = index + 1;
            let id = story.video_id(index);

            log_separator(Some(&format!("VIDEO {}/{}: {}", position, stories.len(), id)));
            let started = Instant::now();

            let mut timings = StageTimings::default();
            let result = self.produce(index, story, &mut timings).await;
            summary.stage_stats.record(&timings);
            let elapsed = started.elapsed().as_secs_f64();

            match result {
                Ok(output) => {
                    summary.succeeded += 1;
                    info!("");
                    info!("✅ VIDEO {}/{} DONE", position, stories.len());
                    info!("  ├─ File: {}", output.final_video.display());
                    info!("  ├─ Duration: {:.1}s", output.video.duration);
                    info!("  └─ Total time: {}", format_duration(elapsed));
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("");
                    error!("❌ VIDEO {}/{} FAILED", position, stories.len());
                    error!("  ├─ ID: {}", id);
                    error!("  ├─ Time until failure: {}", format_duration(elapsed));
                    error!("  └─ Error: {}", e.user_message());
                    summary.failures.push(StoryFailure {
                        index: position,
                        id,
                        error: e.user_message(),
                        elapsed,
                    });
                }
            }

            gpu::log_memory_usage(&format!("[After video {}]", position)).await;
        }

        summary.elapsed = batch_started.elapsed().as_secs_f64();
        debug!("Stage averages: {}", describe_stats(&summary.stage_stats));
        summary
    }
}

/// Stage averages on one line
pub fn describe_stats(stats: &StageStats) -> String {
    let part = |label: &str, avg: Option<f64>| avg.map(|a| format!("{} {}", label, format_duration(a)));
    [
        part("audio", stats.average_audio()),
        part("images", stats.average_images()),
        part("assembly", stats.average_assembly()),
        part("captions", stats.average_captions()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ")
}
