//! LumaCut Audio
//!
//! Audio processing for the primary clip:
//! - **Filter graph:** one switchable biquad stage (flat, noise reduction
//!   low-pass, voice isolation band-pass) followed by a gain stage
//! - **Subtitle Generation:** placeholder cues and SRT/VTT output

pub mod graph;
pub mod subtitles;

pub use graph::*;
pub use subtitles::*;
