//! The primary and overlay bindings driven as one transport.

use lumacut_common::clock::DriftMeasurement;
use lumacut_common::error::LumacutResult;

use crate::binding::{BindingRole, MediaBinding};

/// Drift between overlay and primary above which the overlay is re-seeked.
pub const RESYNC_THRESHOLD_MS: f64 = 100.0;

/// Both playable elements of the editor.
#[derive(Debug)]
pub struct MediaDeck {
    pub primary: MediaBinding,
    pub overlay: MediaBinding,
}

impl Default for MediaDeck {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDeck {
    pub fn new() -> Self {
        Self {
            primary: MediaBinding::new(BindingRole::Primary),
            overlay: MediaBinding::new(BindingRole::Overlay),
        }
    }

    pub fn binding(&self, role: BindingRole) -> &MediaBinding {
        match role {
            BindingRole::Primary => &self.primary,
            BindingRole::Overlay => &self.overlay,
        }
    }

    pub fn binding_mut(&mut self, role: BindingRole) -> &mut MediaBinding {
        match role {
            BindingRole::Primary => &mut self.primary,
            BindingRole::Overlay => &mut self.overlay,
        }
    }

    /// Start the primary, then the overlay if one is bound.
    ///
    /// Only a primary failure is reported; an overlay that cannot play is
    /// logged and left paused.
    pub fn play(&mut self) -> LumacutResult<()> {
        self.primary.play()?;
        if self.overlay.has_source() {
            if let Err(e) = self.overlay.play() {
                tracing::warn!(error = %e, "Overlay did not start");
            }
        }
        Ok(())
    }

    pub fn pause(&mut self) {
        self.primary.pause();
        self.overlay.pause();
    }

    /// Seek both elements. The target is clamped to the primary's duration.
    pub fn seek(&mut self, time_secs: f64) {
        self.primary.seek(time_secs);
        let target = self.primary.position();
        self.overlay.seek(target);
    }

    /// Apply a playback rate to both elements.
    pub fn set_rate(&mut self, rate: f64) {
        self.primary.set_rate(rate);
        self.overlay.set_rate(rate);
    }

    /// Volume applies to the primary only; the overlay is silent.
    pub fn set_volume(&mut self, volume: f64) {
        self.primary.set_volume(volume);
    }

    pub fn is_playing(&self) -> bool {
        self.primary.is_playing()
    }

    /// Position of the primary, which drives subtitles and export.
    pub fn position(&self) -> f64 {
        self.primary.position()
    }

    /// Drift of the overlay relative to the primary, if both are timed.
    pub fn overlay_drift(&self) -> Option<DriftMeasurement> {
        if self.overlay.duration().is_none() || self.primary.duration().is_none() {
            return None;
        }
        Some(DriftMeasurement {
            reference_secs: self.primary.position(),
            measured_secs: self.overlay.position(),
        })
    }

    /// Re-seek the overlay when it has drifted beyond the threshold.
    /// Returns whether a resync happened.
    pub fn resync_overlay(&mut self) -> bool {
        let Some(drift) = self.overlay_drift() else {
            return false;
        };
        // An overlay shorter than the primary legitimately stops early.
        if !self.overlay.is_playing() {
            return false;
        }
        // Past the primary's end the overlay runs free.
        if !self.primary.is_playing() {
            return false;
        }
        if !drift.exceeds_threshold_ms(RESYNC_THRESHOLD_MS) {
            return false;
        }
        tracing::debug!(drift_ms = drift.drift_ms(), "Resyncing overlay to primary");
        self.overlay.seek(drift.reference_secs);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::test_support::FakeVideo;
    use std::time::Duration;

    fn deck(primary: f64, overlay: Option<f64>) -> MediaDeck {
        let mut deck = MediaDeck::new();
        deck.primary.bind(
            Box::new(FakeVideo {
                duration: primary,
                fail: false,
            }),
            "primary",
        );
        if let Some(duration) = overlay {
            deck.overlay.bind(
                Box::new(FakeVideo {
                    duration,
                    fail: false,
                }),
                "overlay",
            );
        }
        deck
    }

    #[test]
    fn test_seek_clamps_to_primary_duration() {
        let mut deck = deck(6.0, Some(20.0));
        deck.seek(15.0);
        assert_eq!(deck.primary.position(), 6.0);
        assert_eq!(deck.overlay.position(), 6.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_pause_moves_both() {
        let mut deck = deck(10.0, Some(10.0));
        deck.play().unwrap();
        assert!(deck.overlay.is_playing());
        tokio::time::advance(Duration::from_secs(2)).await;
        deck.pause();
        assert!(!deck.primary.is_playing());
        assert!(!deck.overlay.is_playing());
        assert!((deck.overlay.position() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_play_without_primary_fails() {
        let mut deck = MediaDeck::new();
        assert!(deck.play().is_err());
    }

    #[test]
    fn test_volume_only_affects_primary() {
        let mut deck = deck(10.0, Some(10.0));
        deck.set_volume(0.4);
        assert_eq!(deck.primary.volume(), 0.4);
        assert_eq!(deck.overlay.volume(), 1.0);
        deck.set_rate(2.0);
        assert_eq!(deck.overlay.rate(), 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_pulls_overlay_back() {
        let mut deck = deck(10.0, Some(10.0));
        deck.play().unwrap();
        deck.overlay.seek(3.0);
        assert!(deck.resync_overlay());
        let drift = deck.overlay_drift().unwrap();
        assert!(!drift.exceeds_threshold_ms(RESYNC_THRESHOLD_MS));
        assert!(!deck.resync_overlay());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_runs_on_after_primary_ends() {
        let mut deck = deck(2.0, Some(6.0));
        deck.play().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!deck.primary.is_playing());

        for _ in 0..3 {
            assert!(!deck.resync_overlay());
            tokio::time::advance(Duration::from_millis(500)).await;
        }
        assert!(deck.overlay.is_playing());
        assert!((deck.overlay.position() - 4.5).abs() < 1e-6);
    }
}
