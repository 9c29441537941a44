//! Word-timed transcription results.

use serde::{Deserialize, Serialize};

/// One spoken word with its time span in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }

    /// Trimmed text with override-tag braces removed
    pub fn display_text(&self) -> String {
        self.text.trim().chars().filter(|c| *c != '{' && *c != '}').collect()
    }
}

/// A transcribed stretch of speech
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub words: Vec<Word>,
}

impl Segment {
    /// Words in consecutive chunks of at most `max_words`
    pub fn word_groups(&self, max_words: usize) -> impl Iterator<Item = &[Word]> {
        self.words.chunks(max_words.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn word_count(&self) -> usize {
        self.segments.iter().map(|s| s.words.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.word_count() == 0
    }

    /// Caption lines across all segments, in order
    pub fn word_groups(&self, max_words: usize) -> impl Iterator<Item = &[Word]> {
        self.segments.iter().flat_map(move |s| s.word_groups(max_words))
    }
}

/// Spread the words of `text` over `start..end`, proportional to their length
pub fn distribute_words(text: &str, start: f64, end: f64) -> Vec<Word> {
    let pieces: Vec<&str> = text.split_whitespace().collect();
    let total_chars: usize = pieces.iter().map(|w| w.chars().count()).sum();
    if pieces.is_empty() || total_chars == 0 {
        return Vec::new();
    }

    let span = (end - start).max(0.0);
    let mut cursor = start;
    let mut words = Vec::with_capacity(pieces.len());

    for (i, piece) in pieces.iter().enumerate() {
        let share = piece.chars().count() as f64 / total_chars as f64;
        let word_end = if i + 1 == pieces.len() { end } else { cursor + span * share };
        words.push(Word::new(*piece, cursor, word_end));
        cursor = word_end;
    }

    words
}
