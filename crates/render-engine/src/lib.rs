//! LumaCut Render Engine
//!
//! Real-time compositing of the editor preview. Every refresh tick redraws
//! the whole surface from the current scene, back to front.
//!
//! # Layer Order
//!
//! ```text
//! black background
//!        │
//!        ├── Primary   (zoom/rotate, brightness → contrast → saturate → blur, opacity)
//!        │
//!        ├── Overlay   (picture-in-picture, drop shadow, optional outline)
//!        │
//!        ├── Text      (stroked + filled, rotated about its anchor)
//!        │
//!        └── Subtitle  (active cue, bottom centre)
//!                │
//!                ▼
//!             Surface ──► preview / export sampler
//! ```

pub mod compositor;
pub mod filters;
pub mod render_loop;
pub mod surface;
pub mod text;

pub use compositor::*;
pub use render_loop::*;
pub use surface::*;
pub use text::*;
