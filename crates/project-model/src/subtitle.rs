//! Timed subtitle cues.

use serde::{Deserialize, Serialize};

/// A subtitle string shown while the primary position is in `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleCue {
    /// Start time in seconds (inclusive).
    pub start_secs: f64,
    /// End time in seconds (exclusive).
    pub end_secs: f64,
    pub text: String,
}

impl SubtitleCue {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self {
            start_secs,
            end_secs,
            text: text.into(),
        }
    }

    /// Whether `time_secs` falls inside this cue's window.
    pub fn contains(&self, time_secs: f64) -> bool {
        time_secs >= self.start_secs && time_secs < self.end_secs
    }

    fn overlaps(&self, other: &SubtitleCue) -> bool {
        self.start_secs < other.end_secs && other.start_secs < self.end_secs
    }
}

/// Sorted, non-overlapping cues: at most one is active at any instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueTrack {
    cues: Vec<SubtitleCue>,
}

impl CueTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a track from cues, rejecting the first invalid or overlapping one.
    pub fn from_cues(cues: impl IntoIterator<Item = SubtitleCue>) -> Result<Self, CueError> {
        let mut track = Self::new();
        for cue in cues {
            track.insert(cue)?;
        }
        Ok(track)
    }

    /// Insert a cue, keeping the track sorted by start time.
    pub fn insert(&mut self, cue: SubtitleCue) -> Result<(), CueError> {
        if !(cue.start_secs >= 0.0 && cue.end_secs > cue.start_secs) {
            return Err(CueError::InvalidWindow {
                start_secs: cue.start_secs,
                end_secs: cue.end_secs,
            });
        }
        if let Some(existing) = self.cues.iter().find(|c| c.overlaps(&cue)) {
            return Err(CueError::Overlap {
                start_secs: cue.start_secs,
                existing_start_secs: existing.start_secs,
            });
        }
        let idx = self
            .cues
            .partition_point(|c| c.start_secs < cue.start_secs);
        self.cues.insert(idx, cue);
        Ok(())
    }

    /// The cue active at `time_secs`, if any.
    pub fn active_at(&self, time_secs: f64) -> Option<&SubtitleCue> {
        let idx = self.cues.partition_point(|c| c.start_secs <= time_secs);
        if idx == 0 {
            return None;
        }
        let candidate = &self.cues[idx - 1];
        candidate.contains(time_secs).then_some(candidate)
    }

    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }

    pub fn clear(&mut self) {
        self.cues.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }
}

/// Errors raised when building a cue track.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CueError {
    #[error("Cue window [{start_secs}, {end_secs}) is empty or negative")]
    InvalidWindow { start_secs: f64, end_secs: f64 },

    #[error("Cue starting at {start_secs}s overlaps the cue starting at {existing_start_secs}s")]
    Overlap {
        start_secs: f64,
        existing_start_secs: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_track() -> CueTrack {
        CueTrack::from_cues([
            SubtitleCue::new(3.0, 5.0, "second"),
            SubtitleCue::new(0.0, 2.5, "first"),
        ])
        .unwrap()
    }

    #[test]
    fn test_active_cue_respects_half_open_window() {
        let track = sample_track();
        assert_eq!(track.active_at(0.0).map(|c| c.text.as_str()), Some("first"));
        assert_eq!(track.active_at(2.4).map(|c| c.text.as_str()), Some("first"));
        assert!(track.active_at(2.5).is_none());
        assert!(track.active_at(2.9).is_none());
        assert_eq!(track.active_at(3.0).map(|c| c.text.as_str()), Some("second"));
        assert!(track.active_at(5.0).is_none());
        assert!(track.active_at(-1.0).is_none());
    }

    #[test]
    fn test_cues_stay_sorted() {
        let track = sample_track();
        assert_eq!(track.cues()[0].text, "first");
        assert_eq!(track.len(), 2);
    }

    #[test]
    fn test_overlap_is_rejected() {
        let mut track = sample_track();
        let err = track.insert(SubtitleCue::new(2.0, 3.5, "clash")).unwrap_err();
        assert!(matches!(err, CueError::Overlap { .. }));
        assert_eq!(track.len(), 2);

        // Touching windows do not overlap.
        assert!(track.insert(SubtitleCue::new(2.5, 3.0, "gap")).is_ok());
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let mut track = CueTrack::new();
        assert!(track.insert(SubtitleCue::new(2.0, 2.0, "empty")).is_err());
        assert!(track.insert(SubtitleCue::new(-1.0, 1.0, "negative")).is_err());
        assert!(track.is_empty());
    }
}
