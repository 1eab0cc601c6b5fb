//! Visual and audio adjustment parameters.
//!
//! Percent-valued factors use 100 as their neutral value. Every write goes
//! through [`EditParameters::apply`], which clamps into the declared bounds.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

pub const BRIGHTNESS_RANGE: RangeInclusive<f64> = 0.0..=200.0;
pub const CONTRAST_RANGE: RangeInclusive<f64> = 0.0..=200.0;
pub const SATURATION_RANGE: RangeInclusive<f64> = 0.0..=200.0;
pub const OPACITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;
/// Blur radius in pixels.
pub const BLUR_RANGE: RangeInclusive<f64> = 0.0..=20.0;
pub const VOLUME_RANGE: RangeInclusive<f64> = 0.0..=100.0;
/// Playback-rate multiplier.
pub const SPEED_RANGE: RangeInclusive<f64> = 0.25..=4.0;
pub const ZOOM_RANGE: RangeInclusive<f64> = 1.0..=3.0;
/// Rotation in degrees.
pub const ROTATE_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// Which single filter the audio graph should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioMode {
    /// Pass-through.
    #[default]
    Flat,
    /// Attenuate hiss above ~3 kHz (noise reduction).
    LowPass,
    /// Keep the ~300-3400 Hz speech band (voice isolation).
    BandPass,
}

/// The mutable adjustment record for the selected primary asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditParameters {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub blur: f64,
    pub opacity: f64,
    pub volume: f64,
    pub speed: f64,
    pub zoom: f64,
    pub rotate: f64,
    pub noise_reduction: bool,
    pub voice_isolation: bool,
    /// Cosmetic only: never changes pixels or audio.
    pub stabilization: bool,
}

impl Default for EditParameters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            blur: 0.0,
            opacity: 100.0,
            volume: 100.0,
            speed: 1.0,
            zoom: 1.0,
            rotate: 0.0,
            noise_reduction: false,
            voice_isolation: false,
            stabilization: false,
        }
    }
}

/// A single edit coming from the property panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "param", content = "value", rename_all = "snake_case")]
pub enum ParamChange {
    Brightness(f64),
    Contrast(f64),
    Saturation(f64),
    Blur(f64),
    Opacity(f64),
    Volume(f64),
    Speed(f64),
    Zoom(f64),
    Rotate(f64),
    NoiseReduction(bool),
    VoiceIsolation(bool),
    Stabilization(bool),
}

impl ParamChange {
    /// Whether this change alters the audio filter selection.
    pub fn affects_audio_mode(&self) -> bool {
        matches!(
            self,
            ParamChange::NoiseReduction(_) | ParamChange::VoiceIsolation(_)
        )
    }
}

impl EditParameters {
    /// Apply one change, clamping numeric values into their bounds.
    ///
    /// Noise reduction and voice isolation are mutually exclusive: enabling
    /// one clears the other.
    pub fn apply(&mut self, change: ParamChange) {
        match change {
            ParamChange::Brightness(v) => self.brightness = clamp_to(v, &BRIGHTNESS_RANGE, 100.0),
            ParamChange::Contrast(v) => self.contrast = clamp_to(v, &CONTRAST_RANGE, 100.0),
            ParamChange::Saturation(v) => self.saturation = clamp_to(v, &SATURATION_RANGE, 100.0),
            ParamChange::Blur(v) => self.blur = clamp_to(v, &BLUR_RANGE, 0.0),
            ParamChange::Opacity(v) => self.opacity = clamp_to(v, &OPACITY_RANGE, 100.0),
            ParamChange::Volume(v) => self.volume = clamp_to(v, &VOLUME_RANGE, 100.0),
            ParamChange::Speed(v) => self.speed = clamp_to(v, &SPEED_RANGE, 1.0),
            ParamChange::Zoom(v) => self.zoom = clamp_to(v, &ZOOM_RANGE, 1.0),
            ParamChange::Rotate(v) => self.rotate = clamp_to(v, &ROTATE_RANGE, 0.0),
            ParamChange::NoiseReduction(on) => {
                self.noise_reduction = on;
                if on {
                    self.voice_isolation = false;
                }
            }
            ParamChange::VoiceIsolation(on) => {
                self.voice_isolation = on;
                if on {
                    self.noise_reduction = false;
                }
            }
            ParamChange::Stabilization(on) => self.stabilization = on,
        }
    }

    /// The audio filter implied by the noise/voice flags.
    pub fn audio_mode(&self) -> AudioMode {
        if self.voice_isolation {
            AudioMode::BandPass
        } else if self.noise_reduction {
            AudioMode::LowPass
        } else {
            AudioMode::Flat
        }
    }

    /// Copy with every numeric field forced into bounds.
    pub fn clamped(&self) -> Self {
        let mut out = self.clone();
        for change in [
            ParamChange::Brightness(self.brightness),
            ParamChange::Contrast(self.contrast),
            ParamChange::Saturation(self.saturation),
            ParamChange::Blur(self.blur),
            ParamChange::Opacity(self.opacity),
            ParamChange::Volume(self.volume),
            ParamChange::Speed(self.speed),
            ParamChange::Zoom(self.zoom),
            ParamChange::Rotate(self.rotate),
        ] {
            out.apply(change);
        }
        if out.noise_reduction && out.voice_isolation {
            out.noise_reduction = false;
        }
        out
    }

    /// Brightness as a multiplier (1.0 = neutral).
    pub fn brightness_factor(&self) -> f64 {
        self.brightness / 100.0
    }

    /// Contrast as a multiplier (1.0 = neutral).
    pub fn contrast_factor(&self) -> f64 {
        self.contrast / 100.0
    }

    /// Saturation as a multiplier (1.0 = neutral).
    pub fn saturation_factor(&self) -> f64 {
        self.saturation / 100.0
    }

    /// Opacity as global alpha in `[0, 1]`.
    pub fn alpha(&self) -> f64 {
        self.opacity / 100.0
    }

    /// Volume as linear gain in `[0, 1]`.
    pub fn gain(&self) -> f64 {
        self.volume / 100.0
    }

    /// Whether the transform step leaves the primary layer untouched.
    pub fn is_identity_transform(&self) -> bool {
        self.zoom == 1.0 && self.rotate == 0.0
    }

    /// Whether the color filter step leaves the primary layer untouched.
    pub fn is_neutral_filter(&self) -> bool {
        self.brightness == 100.0
            && self.contrast == 100.0
            && self.saturation == 100.0
            && self.blur == 0.0
    }
}

fn clamp_to(value: f64, range: &RangeInclusive<f64>, fallback: f64) -> f64 {
    if value.is_nan() {
        return fallback;
    }
    value.clamp(*range.start(), *range.end())
}
