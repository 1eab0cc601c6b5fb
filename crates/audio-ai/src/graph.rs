//! Audio processing graph for the primary clip.
//!
//! Route: primary binding → [`FilterNode`] → gain → output. The filter runs
//! exactly one of three responses selected by [`AudioMode`].

use std::f64::consts::PI;

use lumacut_common::error::{LumacutError, LumacutResult};
use lumacut_media::MediaBinding;
use lumacut_project_model::AudioMode;

/// Noise-reduction cutoff in Hz.
pub const LOW_PASS_CUTOFF_HZ: f64 = 3000.0;
/// Butterworth Q for the low-pass stage.
pub const LOW_PASS_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;
/// Lower edge of the speech band in Hz.
pub const SPEECH_BAND_LOW_HZ: f64 = 300.0;
/// Upper edge of the speech band in Hz.
pub const SPEECH_BAND_HIGH_HZ: f64 = 3400.0;
/// Lowest Q used for the band-pass stage.
pub const BAND_PASS_MIN_Q: f64 = 0.3;

/// Normalized biquad coefficients (divided by a0).
#[derive(Debug, Clone, Copy, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    const BYPASS: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// RBJ Audio EQ Cookbook coefficients for `mode`.
    fn for_mode(mode: AudioMode, sample_rate: f64) -> Self {
        match mode {
            AudioMode::Flat => Self::BYPASS,
            AudioMode::LowPass => Self::low_pass(sample_rate, LOW_PASS_CUTOFF_HZ, LOW_PASS_Q),
            AudioMode::BandPass => {
                let (centre, q) = speech_band();
                Self::band_pass(sample_rate, centre, q)
            }
        }
    }

    fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, frequency, q);
        Self::normalize(
            (1.0 - cos_w0) / 2.0,
            1.0 - cos_w0,
            (1.0 - cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Constant 0 dB peak gain band-pass.
    fn band_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(sample_rate, frequency, q);
        Self::normalize(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
    }

    fn prewarp(sample_rate: f64, frequency: f64, q: f64) -> (f64, f64) {
        // Keep below Nyquist
        let freq = frequency.clamp(20.0, sample_rate / 2.0 - 1.0);
        let w0 = 2.0 * PI * freq / sample_rate;
        (w0.cos(), w0.sin() / (2.0 * q))
    }

    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Centre frequency and Q covering the 300..3400 Hz speech band.
pub fn speech_band() -> (f64, f64) {
    let centre = (SPEECH_BAND_LOW_HZ * SPEECH_BAND_HIGH_HZ).sqrt();
    let q = centre / (SPEECH_BAND_HIGH_HZ - SPEECH_BAND_LOW_HZ);
    (centre, q.max(BAND_PASS_MIN_Q))
}

/// Delay line for one biquad.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output =
            c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// The single switchable filter stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    mode: AudioMode,
    sample_rate: f64,
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl FilterNode {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            mode: AudioMode::Flat,
            sample_rate: sample_rate.max(1) as f64,
            coeffs: BiquadCoeffs::BYPASS,
            state: BiquadState::default(),
        }
    }

    pub fn mode(&self) -> AudioMode {
        self.mode
    }

    /// Switch the response. Selecting the current mode leaves the node
    /// untouched; a real change clears the delay line.
    pub fn set_mode(&mut self, mode: AudioMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.coeffs = BiquadCoeffs::for_mode(mode, self.sample_rate);
        self.state = BiquadState::default();
        true
    }

    pub fn process_sample(&mut self, sample: f32) -> f32 {
        if self.mode == AudioMode::Flat {
            return sample;
        }
        self.state.process(sample as f64, &self.coeffs) as f32
    }
}

/// Filter plus gain, attached to at most one media element.
#[derive(Debug)]
pub struct AudioGraph {
    filter: FilterNode,
    gain: f32,
    attached: bool,
    closed: bool,
}

impl AudioGraph {
    /// Create an open, unattached graph running flat at unity gain.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            filter: FilterNode::new(sample_rate),
            gain: 1.0,
            attached: false,
            closed: false,
        }
    }

    /// Route a binding's output through this graph.
    ///
    /// An element can only be routed once; attaching it again is a no-op.
    pub fn attach(&mut self, binding: &mut MediaBinding) -> LumacutResult<()> {
        if self.closed {
            return Err(LumacutError::audio("Audio graph is closed"));
        }
        if binding.is_audio_attached() {
            tracing::debug!(role = ?binding.role(), "Audio already attached, skipping");
            return Ok(());
        }
        binding.mark_audio_attached();
        self.attached = true;
        tracing::debug!(role = ?binding.role(), "Attached audio graph");
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn mode(&self) -> AudioMode {
        self.filter.mode()
    }

    /// Select the filter response.
    pub fn set_mode(&mut self, mode: AudioMode) {
        if self.filter.set_mode(mode) {
            tracing::info!(mode = ?mode, "Audio filter changed");
        }
    }

    pub fn filter(&self) -> &FilterNode {
        &self.filter
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Output gain in `[0, 1]`.
    pub fn set_gain(&mut self, volume: f64) {
        self.gain = if volume.is_finite() {
            volume.clamp(0.0, 1.0) as f32
        } else {
            1.0
        };
    }

    /// Run a block of mono samples through filter and gain in place.
    /// A closed graph passes audio through unchanged.
    pub fn process(&mut self, block: &mut [f32]) {
        if self.closed {
            return;
        }
        for sample in block.iter_mut() {
            *sample = self.filter.process_sample(*sample) * self.gain;
        }
    }

    /// Release the graph. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.attached = false;
        tracing::debug!("Audio graph closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumacut_media::BindingRole;

    fn sine(freq: f64, sample_rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * freq * n as f64 / sample_rate).sin() as f32)
            .collect()
    }

    fn rms(block: &[f32]) -> f32 {
        (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt()
    }

    #[test]
    fn test_setting_same_mode_is_noop() {
        let mut graph = AudioGraph::new(48_000);
        graph.set_mode(AudioMode::LowPass);
        let mut block = sine(440.0, 48_000.0, 64);
        graph.process(&mut block);
        let before = graph.filter().clone();

        graph.set_mode(AudioMode::LowPass);
        assert_eq!(graph.filter(), &before);
    }

    #[test]
    fn test_low_pass_attenuates_hiss() {
        let mut graph = AudioGraph::new(48_000);
        graph.set_mode(AudioMode::LowPass);

        let mut low = sine(200.0, 48_000.0, 4800);
        let mut high = sine(15_000.0, 48_000.0, 4800);
        graph.process(&mut low);
        graph.set_mode(AudioMode::Flat);
        graph.set_mode(AudioMode::LowPass);
        graph.process(&mut high);

        assert!(rms(&low[480..]) > 0.6);
        assert!(rms(&high[480..]) < 0.1);
    }

    #[test]
    fn test_band_pass_keeps_speech_band() {
        let mut graph = AudioGraph::new(48_000);
        graph.set_mode(AudioMode::BandPass);
        let mut speech = sine(1000.0, 48_000.0, 4800);
        graph.process(&mut speech);
        assert!(rms(&speech[480..]) > 0.6);

        let mut rumble = sine(30.0, 48_000.0, 48_000);
        graph.set_mode(AudioMode::Flat);
        graph.set_mode(AudioMode::BandPass);
        graph.process(&mut rumble);
        assert!(rms(&rumble[4800..]) < 0.1);
    }

    #[test]
    fn test_speech_band_q() {
        let (centre, q) = speech_band();
        assert!((centre - 1009.95).abs() < 0.01);
        assert!((q - 0.3258).abs() < 0.001);
    }

    #[test]
    fn test_flat_and_gain() {
        let mut graph = AudioGraph::new(48_000);
        graph.set_gain(0.5);
        let mut block = vec![0.8f32, -0.4, 0.2];
        graph.process(&mut block);
        assert_eq!(block, vec![0.4, -0.2, 0.1]);
        graph.set_gain(3.0);
        assert_eq!(graph.gain(), 1.0);
    }

    #[test]
    fn test_attach_is_guarded_per_binding() {
        let mut graph = AudioGraph::new(48_000);
        let mut binding = MediaBinding::new(BindingRole::Primary);
        graph.attach(&mut binding).unwrap();
        assert!(binding.is_audio_attached());
        graph.attach(&mut binding).unwrap();
        assert!(graph.is_attached());
    }

    #[test]
    fn test_closed_graph_rejects_attach() {
        let mut graph = AudioGraph::new(48_000);
        graph.close();
        graph.close();
        let mut binding = MediaBinding::new(BindingRole::Primary);
        let err = graph.attach(&mut binding).unwrap_err();
        assert!(matches!(err, LumacutError::Audio { .. }));
        assert!(!binding.is_audio_attached());
    }
}
