//! Playback state around a single media source.
//!
//! Position is derived from a monotonic anchor rather than accumulated per
//! tick: `position = anchor_pos + elapsed * rate`. Changing rate or seeking
//! re-anchors, so the render loop can sample at any cadence without drift.

use std::fmt;

use tokio::time::Instant;

use lumacut_common::error::{LumacutError, LumacutResult};
use lumacut_project_model::params::SPEED_RANGE;

use crate::source::{Frame, MediaSource};

/// Which slot a binding fills in the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingRole {
    Primary,
    Overlay,
}

/// A media source plus its playback state.
pub struct MediaBinding {
    role: BindingRole,
    source: Option<Box<dyn MediaSource>>,
    asset_id: Option<String>,
    playing: bool,
    anchor_pos: f64,
    anchor_at: Option<Instant>,
    rate: f64,
    volume: f64,
    audio_attached: bool,
    failed: bool,
}

impl fmt::Debug for MediaBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBinding")
            .field("role", &self.role)
            .field("source", &self.source.as_ref().map(|s| s.name().to_string()))
            .field("asset_id", &self.asset_id)
            .field("playing", &self.playing)
            .field("position", &self.position())
            .field("rate", &self.rate)
            .field("volume", &self.volume)
            .field("audio_attached", &self.audio_attached)
            .field("failed", &self.failed)
            .finish()
    }
}

impl MediaBinding {
    pub fn new(role: BindingRole) -> Self {
        Self {
            role,
            source: None,
            asset_id: None,
            playing: false,
            anchor_pos: 0.0,
            anchor_at: None,
            rate: 1.0,
            volume: 1.0,
            audio_attached: false,
            failed: false,
        }
    }

    pub fn role(&self) -> BindingRole {
        self.role
    }

    /// Replace the bound source. The binding starts paused at zero.
    ///
    /// Rate, volume and the audio attachment survive a rebind: they belong
    /// to the element, not to the media loaded in it.
    pub fn bind(&mut self, source: Box<dyn MediaSource>, asset_id: impl Into<String>) {
        tracing::debug!(role = ?self.role, source = source.name(), "Binding media source");
        self.source = Some(source);
        self.asset_id = Some(asset_id.into());
        self.playing = false;
        self.anchor_pos = 0.0;
        self.anchor_at = None;
        self.failed = false;
    }

    /// Drop the bound source.
    pub fn unbind(&mut self) {
        self.source = None;
        self.asset_id = None;
        self.playing = false;
        self.anchor_pos = 0.0;
        self.anchor_at = None;
        self.failed = false;
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn asset_id(&self) -> Option<&str> {
        self.asset_id.as_deref()
    }

    /// Duration of the bound source. `None` for stills or when unbound.
    pub fn duration(&self) -> Option<f64> {
        self.source.as_ref().and_then(|s| s.duration_secs())
    }

    /// Start playback from the current position. Calling it while already
    /// playing is a no-op.
    pub fn play(&mut self) -> LumacutResult<()> {
        if self.source.is_none() {
            return Err(LumacutError::media(format!(
                "No {:?} media bound",
                self.role
            )));
        }
        if self.failed {
            return Err(LumacutError::media(format!(
                "{:?} media cannot be decoded",
                self.role
            )));
        }
        if self.is_playing() {
            return Ok(());
        }
        if self.at_end() {
            self.anchor_pos = 0.0;
        }
        self.anchor_at = Some(Instant::now());
        self.playing = true;
        Ok(())
    }

    /// Freeze the position. Calling it while paused is a no-op.
    pub fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.anchor_pos = self.position();
        self.anchor_at = None;
        self.playing = false;
    }

    /// Whether the position is advancing. Playback stops by itself at the
    /// end of a timed source.
    pub fn is_playing(&self) -> bool {
        self.playing && !self.at_end()
    }

    /// Current playback position in seconds.
    pub fn position(&self) -> f64 {
        let elapsed = match (self.playing, self.anchor_at) {
            (true, Some(at)) => at.elapsed().as_secs_f64() * self.rate,
            _ => 0.0,
        };
        let pos = self.anchor_pos + elapsed;
        match self.duration() {
            Some(duration) => pos.min(duration),
            None => pos,
        }
    }

    /// Jump to `time_secs`, clamped to `[0, duration]`.
    ///
    /// Seeking after playback ran off the end leaves the binding paused.
    pub fn seek(&mut self, time_secs: f64) {
        self.settle_end();
        let mut target = if time_secs.is_finite() {
            time_secs.max(0.0)
        } else {
            0.0
        };
        if let Some(duration) = self.duration() {
            target = target.min(duration);
        }
        self.anchor_pos = target;
        if self.playing {
            self.anchor_at = Some(Instant::now());
        }
    }

    /// Turn a run-off-the-end into an explicit pause at the duration.
    fn settle_end(&mut self) {
        if self.playing && self.at_end() {
            self.anchor_pos = self.position();
            self.anchor_at = None;
            self.playing = false;
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Set the playback-rate multiplier, clamped into the speed bounds.
    pub fn set_rate(&mut self, rate: f64) {
        let rate = if rate.is_finite() {
            rate.clamp(*SPEED_RANGE.start(), *SPEED_RANGE.end())
        } else {
            1.0
        };
        self.settle_end();
        if self.playing {
            self.anchor_pos = self.position();
            self.anchor_at = Some(Instant::now());
        }
        self.rate = rate;
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set linear volume in `[0, 1]`.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    /// Whether an audio graph has already been attached to this element.
    pub fn is_audio_attached(&self) -> bool {
        self.audio_attached
    }

    /// Record that an audio graph now owns this element's output. An element
    /// can be attached at most once.
    pub fn mark_audio_attached(&mut self) {
        self.audio_attached = true;
    }

    /// Whether the bound source failed to decode.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Frame for the current position.
    ///
    /// A decode failure is logged once, marks the binding as failed and
    /// yields `None` from then on, so the compositor simply skips the layer.
    pub fn current_frame(&mut self) -> Option<Frame> {
        if self.failed {
            return None;
        }
        let position = self.position();
        let role = self.role;
        let source = self.source.as_mut()?;
        match source.frame_at(position) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    role = ?role,
                    source = source.name(),
                    error = %e,
                    "Media source failed to decode, skipping layer"
                );
                self.failed = true;
                self.playing = false;
                None
            }
        }
    }

    fn at_end(&self) -> bool {
        match self.duration() {
            Some(duration) => self.position() >= duration,
            None => false,
        }
    }
}
