//! LumaCut Project Model
//!
//! Defines the core data contracts shared by the editor components:
//! - **Assets:** Immutable media records and the append-only asset store
//! - **Parameters:** Visual and audio adjustments applied during composition
//! - **Transforms:** Placement of the overlay and text layers
//! - **Subtitles:** Timed cues shown over the primary layer
//!
//! Layer positions are normalized to `[0.0, 1.0]` relative to the drawing
//! surface so they survive surface size changes.

pub mod asset;
pub mod params;
pub mod subtitle;
pub mod transform;

pub use asset::*;
pub use params::*;
pub use subtitle::*;
pub use transform::*;
