use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::engine;
use crate::error::{CaptionError, EngineError, PipelineError, Result};

/// Quote a path for use as an ffmpeg filter option value
///
/// Option-level escaping for `\ ' : =`, then the whole value is wrapped
/// in graph-level single quotes.
pub fn escape_filter_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.display().to_string().chars() {
        if matches!(c, '\\' | '\'' | ':' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("'{}'", escaped.replace('\'', "'\\''"))
}

/// The `-vf` argument for burning `ass_file`
pub fn ass_filter(ass_file: &Path, fonts_dir: Option<&Path>) -> String {
    let mut filter = format!("ass=filename={}", escape_filter_path(ass_file));
    if let Some(dir) = fonts_dir {
        filter.push_str(&format!(":fontsdir={}", escape_filter_path(dir)));
    }
    filter
}

pub fn burn_args(input: &Path, ass_file: &Path, output: &Path, fonts_dir: Option<&Path>) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-vf".to_string(),
        ass_filter(ass_file, fonts_dir),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "medium".to_string(),
        "-crf".to_string(),
        "23".to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        "-y".to_string(),
        output.display().to_string(),
    ]
}

/// Burn an ASS file into a video with ffmpeg
pub async fn burn_subtitles(
    ffmpeg: &str,
    input: &Path,
    ass_file: &Path,
    output: &Path,
    fonts_dir: Option<&Path>,
) -> Result<()> {
    info!("Rendering video with captions...");
    let args = burn_args(input, ass_file, output, fonts_dir);
    debug!("FFmpeg command: {} {}", ffmpeg, args.join(" "));

    match engine::run(ffmpeg, args).await {
        Ok(_) => {
            info!("✓ Rendering finished");
            Ok(())
        }
        Err(PipelineError::Engine(EngineError::Failed { status, stderr_tail, .. })) => {
            error!("FFmpeg failed with {}", status);
            if !stderr_tail.is_empty() {
                error!("Last lines of the error:\n{}", stderr_tail);
            }
            Err(CaptionError::RenderFailed {
                reason: format!("ffmpeg exited with {}: {}", status, stderr_tail),
            }
            .into())
        }
        Err(e) => Err(e),
    }
}

/// Writes captions into a video file
#[async_trait]
pub trait SubtitleBurner: Send + Sync {
    async fn burn(&self, input: &Path, ass_file: &Path, output: &Path) -> Result<()>;
}

pub struct FfmpegBurner {
    ffmpeg: String,
    fonts_dir: Option<PathBuf>,
}

impl FfmpegBurner {
    pub fn new(ffmpeg: impl Into<String>, fonts_dir: Option<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            fonts_dir,
        }
    }
}

#[async_trait]
impl SubtitleBurner for FfmpegBurner {
    async fn burn(&self, input: &Path, ass_file: &Path, output: &Path) -> Result<()> {
        burn_subtitles(&self.ffmpeg, input, ass_file, output, self.fonts_dir.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain_path() {
        assert_eq!(escape_filter_path(Path::new("/tmp/subs.ass")), "'/tmp/subs.ass'");
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape_filter_path(Path::new("/tmp/a b:c.ass")), "'/tmp/a b\\:c.ass'");
        assert_eq!(escape_filter_path(Path::new("/tmp/x=y.ass")), "'/tmp/x\\=y.ass'");
        assert_eq!(escape_filter_path(Path::new("/tmp/it's.ass")), "'/tmp/it\\'\\''s.ass'");
    }

    #[test]
    fn test_filter_with_fonts_dir() {
        let filter = ass_filter(Path::new("/tmp/s.ass"), Some(Path::new("/fonts")));
        assert_eq!(filter, "ass=filename='/tmp/s.ass':fontsdir='/fonts'");
    }

    #[test]
    fn test_burn_args() {
        let args = burn_args(Path::new("base.mp4"), Path::new("/tmp/s.ass"), Path::new("final.mp4"), None);
        assert_eq!(
            args.join(" "),
            "-hide_banner -i base.mp4 -vf ass=filename='/tmp/s.ass' -c:v libx264 -preset medium -crf 23 -c:a copy -y final.mp4"
        );
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_reports_not_found() {
        let result = burn_subtitles(
            "reelsmith-no-such-ffmpeg",
            Path::new("in.mp4"),
            Path::new("s.ass"),
            Path::new("out.mp4"),
            None,
        )
        .await;
        assert!(matches!(result, Err(PipelineError::Engine(EngineError::NotFound { .. }))));
    }
}
