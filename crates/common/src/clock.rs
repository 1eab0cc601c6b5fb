//! Frame pacing and timebase utilities.
//!
//! The render loop, the export sampler, and the media bindings all count
//! time in seconds (`f64`) against a monotonic clock. This module provides:
//! - Conversions between refresh rates, frame intervals, and frame indices
//! - Drift measurement between two media timebases

use std::time::Duration;

/// A fixed frame rate used to pace a periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacing {
    hz: u32,
}

impl FramePacing {
    /// Create pacing for the given rate. A zero rate is treated as 1 Hz.
    pub fn new(hz: u32) -> Self {
        Self { hz: hz.max(1) }
    }

    /// Frames per second.
    pub fn hz(&self) -> u32 {
        self.hz
    }

    /// Time between two consecutive frames.
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.hz as u64)
    }

    /// Index of the frame that is on screen at `secs`.
    pub fn frame_index_at(&self, secs: f64) -> u64 {
        if secs <= 0.0 {
            return 0;
        }
        (secs * self.hz as f64).floor() as u64
    }

    /// Start time of a frame index in seconds.
    pub fn frame_start_secs(&self, index: u64) -> f64 {
        index as f64 / self.hz as f64
    }

    /// Number of frames needed to cover `secs`.
    pub fn frames_in(&self, secs: f64) -> u64 {
        if secs <= 0.0 {
            return 0;
        }
        (secs * self.hz as f64).ceil() as u64
    }
}

/// Convert seconds to a `Duration`, clamping negatives and NaN to zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

/// Drift measurement between two playback positions.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Position of the reference timebase (seconds).
    pub reference_secs: f64,
    /// Position of the measured timebase (seconds).
    pub measured_secs: f64,
}

impl DriftMeasurement {
    /// Drift in seconds (positive = measured is ahead).
    pub fn drift_secs(&self) -> f64 {
        self.measured_secs - self.reference_secs
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_secs() * 1000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_for_common_rates() {
        assert_eq!(FramePacing::new(60).interval(), Duration::from_nanos(16_666_666));
        assert_eq!(FramePacing::new(30).interval(), Duration::from_nanos(33_333_333));
        assert_eq!(FramePacing::new(0).hz(), 1);
    }

    #[test]
    fn test_frame_index_and_count() {
        let pacing = FramePacing::new(30);
        assert_eq!(pacing.frame_index_at(0.0), 0);
        assert_eq!(pacing.frame_index_at(1.0), 30);
        assert_eq!(pacing.frame_index_at(-2.0), 0);
        assert_eq!(pacing.frames_in(12.0), 360);
        assert_eq!(pacing.frames_in(0.01), 1);
        assert!((pacing.frame_start_secs(45) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_secs_to_duration_clamps() {
        assert_eq!(secs_to_duration(-1.0), Duration::ZERO);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn test_drift_measurement() {
        let drift = DriftMeasurement {
            reference_secs: 1.0,
            measured_secs: 1.05,
        };
        assert!((drift.drift_ms() - 50.0).abs() < 1e-6);
        assert!(drift.exceeds_threshold_ms(10.0));
        assert!(!drift.exceeds_threshold_ms(100.0));
    }
}
