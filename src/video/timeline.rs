use crate::error::{Result, VideoError};

/// Time window in which one scene image is on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneWindow {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl SceneWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Fraction of the window elapsed at `time`
    pub fn progress(&self, time: f64) -> f64 {
        if self.duration() <= 0.0 {
            return 0.0;
        }
        ((time - self.start) / self.duration()).clamp(0.0, 1.0)
    }
}

/// What to draw for one output frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    /// Scene drawn underneath, with its Ken-Burns progress
    pub primary: (usize, f64),

    /// Scene fading in on top: (index, progress, opacity)
    pub incoming: Option<(usize, f64, f32)>,
}

/// Slideshow timeline: equal slots per scene with crossfades at the joins
///
/// Each scene owns a slot of `total / n` seconds. Every scene after the
/// first appears `transition` seconds before its slot and fades in over the
/// previous one; the last scene holds until the end.
#[derive(Debug, Clone)]
pub struct SceneTimeline {
    windows: Vec<SceneWindow>,
    slot: f64,
    transition: f64,
    total: f64,
}

impl SceneTimeline {
    pub fn build(total: f64, scene_count: usize, transition: f64) -> Result<Self> {
        if scene_count == 0 {
            return Err(VideoError::InvalidParameters {
                details: "timeline needs at least one scene".to_string(),
            }
            .into());
        }

        if !(total > 0.0 && total.is_finite()) {
            return Err(VideoError::InvalidParameters {
                details: format!("invalid timeline duration {}", total),
            }
            .into());
        }

        let slot = total / scene_count as f64;
        // A fade may not eat more than half a slot
        let transition = transition.clamp(0.0, slot / 2.0);

        let windows = (0..scene_count)
            .map(|index| {
                let slot_start = index as f64 * slot;
                let start = if index == 0 { 0.0 } else { slot_start - transition };
                let end = if index + 1 == scene_count { total } else { slot_start + slot };
                SceneWindow { index, start, end }
            })
            .collect();

        Ok(Self {
            windows,
            slot,
            transition,
            total,
        })
    }

    pub fn windows(&self) -> &[SceneWindow] {
        &self.windows
    }

    pub fn slot_duration(&self) -> f64 {
        self.slot
    }

    /// Effective crossfade after clamping
    pub fn transition(&self) -> f64 {
        self.transition
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Resolve what is on screen at `time`
    pub fn plan_at(&self, time: f64) -> FramePlan {
        let last = self.windows.len() - 1;
        let time = time.clamp(0.0, self.total);
        let current = ((time / self.slot).floor() as usize).min(last);

        let window = self.windows[current];
        let primary = (current, window.progress(time));

        let incoming = self.windows.get(current + 1).and_then(|next| {
            if self.transition > 0.0 && time >= next.start {
                let alpha = ((time - next.start) / self.transition).clamp(0.0, 1.0) as f32;
                Some((next.index, next.progress(time), alpha))
            } else {
                None
            }
        });

        FramePlan { primary, incoming }
    }
}
