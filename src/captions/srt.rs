use std::path::Path;

use crate::captions::transcript::{Transcript, Word};
use crate::error::{CaptionError, Result};

/// `HH:MM:SS,mmm`
pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct SrtCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Plain SubRip export using the same line grouping as the burned captions
#[derive(Debug, Clone, Default)]
pub struct SrtDocument {
    cues: Vec<SrtCue>,
}

impl SrtDocument {
    pub fn from_transcript(transcript: &Transcript, max_words_per_line: usize) -> Self {
        let cues = transcript
            .word_groups(max_words_per_line)
            .filter_map(|group| {
                let (first, last) = (group.first()?, group.last()?);
                Some(SrtCue {
                    start: first.start,
                    end: last.end,
                    text: group.iter().map(Word::display_text).collect::<Vec<_>>().join(" "),
                })
            })
            .collect();

        Self { cues }
    }

    pub fn cues(&self) -> &[SrtCue] {
        &self.cues
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, cue) in self.cues.iter().enumerate() {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                format_srt_time(cue.start),
                format_srt_time(cue.end),
                cue.text
            ));
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()).map_err(|e| CaptionError::RenderFailed {
            reason: format!("cannot write {}: {}", path.display(), e),
        })?;
        Ok(())
    }
}
