//! Advanced SubStation Alpha caption documents.

use std::fmt;
use std::path::Path;

use crate::captions::transcript::{Transcript, Word};
use crate::config::CaptionConfig;
use crate::error::{CaptionError, Result};

/// Colour in ASS notation (`&HAABBGGRR`, alpha 00 = opaque)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl AssColor {
    /// Parse `#RRGGBB` (leading `#` optional)
    pub fn from_hex(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || CaptionError::InvalidColor {
            value: value.to_string(),
        };

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid().into());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl fmt::Display for AssColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&H00{:02X}{:02X}{:02X}", self.b, self.g, self.r)
    }
}

/// `H:MM:SS.cc`, centiseconds truncated
pub fn format_ass_time(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0 + 1e-6).floor() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        cs
    )
}

/// Look of the burned-in captions
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font: String,
    pub font_size: u32,
    pub primary: AssColor,
    pub outline: AssColor,
    pub stroke_width: u32,
    pub shadow: u32,
    pub highlight_current_word: bool,
    pub highlight: AssColor,
    /// Bottom margin in pixels
    pub padding: u32,
    pub max_words_per_line: usize,
    /// Script resolution, matching the video
    pub play_res: (u32, u32),
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font: "Impact".to_string(),
            font_size: 70,
            primary: AssColor { r: 255, g: 255, b: 255 },
            outline: AssColor { r: 0, g: 0, b: 0 },
            stroke_width: 4,
            shadow: 2,
            highlight_current_word: false,
            highlight: AssColor { r: 255, g: 255, b: 0 },
            padding: 80,
            max_words_per_line: 3,
            play_res: (1080, 1920),
        }
    }
}

impl CaptionStyle {
    pub fn from_config(captions: &CaptionConfig, play_res: (u32, u32)) -> Result<Self> {
        Ok(Self {
            font: captions.font.clone(),
            font_size: captions.font_size,
            primary: AssColor::from_hex(&captions.font_color)?,
            outline: AssColor::from_hex(&captions.stroke_color)?,
            stroke_width: captions.stroke_width,
            shadow: captions.shadow_strength,
            highlight_current_word: captions.highlight_current_word,
            highlight: AssColor::from_hex(&captions.word_highlight_color)?,
            padding: captions.padding,
            max_words_per_line: captions.max_words_per_line.max(1),
            play_res,
        })
    }

    fn style_line(&self, name: &str, colour: AssColor) -> String {
        format!(
            "Style: {name},{font},{size},{c},{c},{outline},&H00000000,-1,0,0,0,100,100,0,0,1,{stroke},{shadow},2,10,10,{margin},1",
            name = name,
            font = self.font,
            size = self.font_size,
            c = colour,
            outline = self.outline,
            stroke = self.stroke_width,
            shadow = self.shadow,
            margin = self.padding,
        )
    }
}

/// One `Dialogue:` line
#[derive(Debug, Clone, PartialEq)]
pub struct AssEvent {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct AssDocument {
    style: CaptionStyle,
    events: Vec<AssEvent>,
}

impl AssDocument {
    pub fn from_transcript(transcript: &Transcript, style: &CaptionStyle) -> Self {
        let mut events = Vec::new();

        for group in transcript.word_groups(style.max_words_per_line) {
            if style.highlight_current_word {
                for (current, word) in group.iter().enumerate() {
                    events.push(AssEvent {
                        start: word.start,
                        end: word.end,
                        text: highlighted_line(group, current, style),
                    });
                }
            } else if let (Some(first), Some(last)) = (group.first(), group.last()) {
                events.push(AssEvent {
                    start: first.start,
                    end: last.end,
                    text: plain_line(group),
                });
            }
        }

        Self {
            style: style.clone(),
            events,
        }
    }

    pub fn events(&self) -> &[AssEvent] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn render(&self) -> String {
        let style = &self.style;
        let mut out = String::new();

        out.push_str("[Script Info]\n");
        out.push_str("ScriptType: v4.00+\n");
        out.push_str(&format!("PlayResX: {}\n", style.play_res.0));
        out.push_str(&format!("PlayResY: {}\n", style.play_res.1));
        out.push_str("WrapStyle: 0\n\n");

        out.push_str("[V4+ Styles]\n");
        out.push_str(
            "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, \
             Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, \
             Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
        );
        out.push_str(&style.style_line("Default", style.primary));
        out.push('\n');
        if style.highlight_current_word {
            out.push_str(&style.style_line("Highlight", style.highlight));
            out.push('\n');
        }
        out.push('\n');

        out.push_str("[Events]\n");
        out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
        for event in &self.events {
            out.push_str(&format!(
                "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
                format_ass_time(event.start),
                format_ass_time(event.end),
                event.text
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

fn plain_line(group: &[Word]) -> String {
    group.iter().map(Word::display_text).collect::<Vec<_>>().join(" ")
}

fn highlighted_line(group: &[Word], current: usize, style: &CaptionStyle) -> String {
    group
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if i == current {
                format!("{{\\c{}}}{}{{\\c{}}}", style.highlight, word.display_text(), style.primary)
            } else {
                word.display_text()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::transcript::Segment;

    fn transcript() -> Transcript {
        Transcript::new(vec![
            Segment {
                start: 0.0,
                end: 2.0,
                text: "one two three four".into(),
                words: vec![
                    Word::new(" one", 0.0, 0.5),
                    Word::new(" two", 0.5, 1.0),
                    Word::new(" three", 1.0, 1.5),
                    Word::new(" four", 1.5, 2.0),
                ],
            },
            Segment {
                start: 2.0,
                end: 3.0,
                text: "[music]".into(),
                words: vec![],
            },
        ])
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(AssColor::from_hex("#FFFF00").unwrap().to_string(), "&H0000FFFF");
        assert_eq!(AssColor::from_hex("#102030").unwrap().to_string(), "&H00302010");
        assert_eq!(AssColor::from_hex("abcdef").unwrap().to_string(), "&H00EFCDAB");
        assert!(AssColor::from_hex("#FFF").is_err());
        assert!(AssColor::from_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_ass_time() {
        assert_eq!(format_ass_time(0.0), "0:00:00.00");
        assert_eq!(format_ass_time(83.456), "0:01:23.45");
        assert_eq!(format_ass_time(1.23), "0:00:01.23");
        assert_eq!(format_ass_time(3725.999), "1:02:05.99");
        assert_eq!(format_ass_time(-1.0), "0:00:00.00");
    }

    #[test]
    fn test_plain_events_group_words() {
        let doc = AssDocument::from_transcript(&transcript(), &CaptionStyle::default());
        assert_eq!(doc.event_count(), 2);
        assert_eq!(
            doc.events()[0],
            AssEvent {
                start: 0.0,
                end: 1.5,
                text: "one two three".into()
            }
        );
        assert_eq!(doc.events()[1].text, "four");

        let rendered = doc.render();
        assert!(rendered.contains("Dialogue: 0,0:00:00.00,0:00:01.50,Default,,0,0,0,,one two three\n"));
        assert!(rendered.contains("PlayResX: 1080\nPlayResY: 1920\nWrapStyle: 0"));
        assert!(rendered.contains(
            "Style: Default,Impact,70,&H00FFFFFF,&H00FFFFFF,&H00000000,&H00000000,-1,0,0,0,100,100,0,0,1,4,2,2,10,10,80,1\n"
        ));
        assert!(!rendered.contains("Style: Highlight"));
    }

    #[test]
    fn test_highlight_one_event_per_word() {
        let style = CaptionStyle {
            highlight_current_word: true,
            max_words_per_line: 2,
            ..CaptionStyle::default()
        };
        let doc = AssDocument::from_transcript(&transcript(), &style);

        assert_eq!(doc.event_count(), 4);
        assert_eq!(doc.events()[1].text, "one {\\c&H0000FFFF}two{\\c&H00FFFFFF}");
        assert_eq!((doc.events()[1].start, doc.events()[1].end), (0.5, 1.0));
        assert!(doc.render().contains("Style: Highlight,Impact,70,&H0000FFFF"));
    }

    #[test]
    fn test_rendered_sections_in_order() {
        let style = CaptionStyle {
            highlight_current_word: true,
            ..CaptionStyle::default()
        };
        let rendered = AssDocument::from_transcript(&Transcript::default(), &style).render();

        let styles = rendered.find("[V4+ Styles]\n").unwrap();
        let default = rendered.find("\nStyle: Default,").unwrap();
        let highlight = rendered.find("\nStyle: Highlight,").unwrap();
        let events = rendered.find(",1\n\n[Events]\nFormat: Layer,").unwrap();
        assert!(styles < default && default < highlight && highlight < events);
        assert!(rendered.ends_with("Effect, Text\n"));
    }

    #[test]
    fn test_braces_cannot_inject_tags() {
        let t = Transcript::new(vec![Segment {
            start: 0.0,
            end: 1.0,
            text: String::new(),
            words: vec![Word::new("{\\fs200}big", 0.0, 1.0)],
        }]);
        let doc = AssDocument::from_transcript(&t, &CaptionStyle::default());
        assert_eq!(doc.events()[0].text, "\\fs200big");
    }

    #[test]
    fn test_style_from_config_and_resolution() {
        let mut config = CaptionConfig::default();
        config.font_color = "#00FF00".into();
        let style = CaptionStyle::from_config(&config, (720, 1280)).unwrap();
        assert_eq!(style.primary.to_string(), "&H0000FF00");

        let doc = AssDocument::from_transcript(&Transcript::default(), &style);
        assert_eq!(doc.event_count(), 0);
        assert!(doc.render().contains("PlayResX: 720\nPlayResY: 1280"));

        config.stroke_color = "black".into();
        assert!(CaptionStyle::from_config(&config, (720, 1280)).is_err());
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.ass");
        let doc = AssDocument::from_transcript(&transcript(), &CaptionStyle::default());
        doc.write_to(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), doc.render());
    }
}
