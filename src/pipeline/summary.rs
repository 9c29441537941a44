use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::logging::log_separator;

/// `"2m 35s"` from a minute up, `"45.1s"` below
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    if seconds >= 60.0 {
        let minutes = (seconds / 60.0).floor() as u64;
        let secs = (seconds % 60.0).floor() as u64;
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{:.1}s", seconds)
    }
}

/// Seconds spent in each stage of one story
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimings {
    pub audio: Option<f64>,
    pub images: Option<f64>,
    pub assembly: Option<f64>,
    pub captions: Option<f64>,
}

/// Stage durations collected across a batch
#[derive(Debug, Clone, Default)]
pub struct StageStats {
    pub audio: Vec<f64>,
    pub images: Vec<f64>,
    pub assembly: Vec<f64>,
    pub captions: Vec<f64>,
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl StageStats {
    /// Add every stage that finished
    pub fn record(&mut self, timings: &StageTimings) {
        let pairs = [
            (&mut self.audio, timings.audio),
            (&mut self.images, timings.images),
            (&mut self.assembly, timings.assembly),
            (&mut self.captions, timings.captions),
        ];
        for (values, timing) in pairs {
            if let Some(seconds) = timing {
                values.push(seconds);
            }
        }
    }

    pub fn average_audio(&self) -> Option<f64> {
        average(&self.audio)
    }

    pub fn average_images(&self) -> Option<f64> {
        average(&self.images)
    }

    pub fn average_assembly(&self) -> Option<f64> {
        average(&self.assembly)
    }

    pub fn average_captions(&self) -> Option<f64> {
        average(&self.captions)
    }
}

/// A story that did not produce a final video
#[derive(Debug, Clone, PartialEq)]
pub struct StoryFailure {
    /// 1-based position in the story list
    pub index: usize,
    pub id: String,
    pub error: String,
    pub elapsed: f64,
}

/// How a batch went, as far as the exit code is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    AllSucceeded,
    PartialFailure,
    TotalFailure,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::AllSucceeded => 0,
            RunOutcome::PartialFailure => 1,
            RunOutcome::TotalFailure => 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Wall-clock seconds for the batch
    pub elapsed: f64,
    pub failures: Vec<StoryFailure>,
    pub stage_stats: StageStats,
    pub output_dir: PathBuf,
}

impl RunSummary {
    pub fn new(total: usize, output_dir: &Path) -> Self {
        Self {
            total,
            output_dir: output_dir.to_path_buf(),
            ..Self::default()
        }
    }

    /// An empty batch counts as a success
    pub fn outcome(&self) -> RunOutcome {
        if self.failed == 0 {
            RunOutcome::AllSucceeded
        } else if self.succeeded == 0 {
            RunOutcome::TotalFailure
        } else {
            RunOutcome::PartialFailure
        }
    }

    fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }

    /// Average wall-clock time per finished video
    pub fn average_per_success(&self) -> Option<f64> {
        if self.succeeded == 0 {
            None
        } else {
            Some(self.elapsed / self.succeeded as f64)
        }
    }

    /// Write the end-of-run report to the log
    pub fn log_report(&self) {
        log_separator(Some("FINAL PROCESSING SUMMARY"));

        info!("⏱️  Total run time: {}", format_duration(self.elapsed));
        info!("");
        info!("📊 Statistics:");
        info!("  ├─ Total processed: {}", self.total);
        info!("  ├─ ✅ Succeeded: {} ({:.1}%)", self.succeeded, self.percent(self.succeeded));
        info!("  └─ ❌ Failed: {} ({:.1}%)", self.failed, self.percent(self.failed));

        if self.succeeded > 0 {
            let stats = &self.stage_stats;
            let rows = [
                ("Audio (TTS)", stats.average_audio()),
                ("Images (SD)", stats.average_images()),
                ("Assembly", stats.average_assembly()),
                ("Captions", stats.average_captions()),
            ];
            let rows: Vec<(&str, f64)> = rows
                .into_iter()
                .filter_map(|(label, avg)| avg.map(|a| (label, a)))
                .collect();

            info!("");
            info!("⏱️  Average time per stage:");
            for (i, (label, avg)) in rows.iter().enumerate() {
                let branch = if i + 1 == rows.len() { "└─" } else { "├─" };
                info!("  {} {}: {}", branch, label, format_duration(*avg));
            }

            if let Some(per_video) = self.average_per_success() {
                info!("");
                info!("📈 Average time per successful video: {}", format_duration(per_video));
            }
        }

        if !self.failures.is_empty() {
            info!("");
            warn!("⚠️  Failed videos:");
            for failure in &self.failures {
                warn!("  ├─ #{}: {} - {}", failure.index, failure.id, failure.error);
            }
        }

        info!("");
        let output_dir = std::fs::canonicalize(&self.output_dir).unwrap_or_else(|_| self.output_dir.clone());
        info!("📁 Files saved to: {}", output_dir.display());

        log_separator(Some("PIPELINE FINISHED"));
        if self.outcome() == RunOutcome::TotalFailure {
            error!("No video was produced");
        }
    }
}
