//! LumaCut Editor
//!
//! The editor owns one scene, one media deck, one audio graph, and one
//! drawing surface. A render loop redraws the surface from the scene at the
//! refresh rate; the export controller records that surface into a new
//! asset.
//!
//! All editor state sits behind a single lock. A render tick holds it for
//! the whole draw, so an edit made between two ticks is visible in the next
//! one and never half-applied.

pub mod editor;
pub mod effects;
pub mod interaction;
pub mod scene;

pub use editor::*;
pub use effects::*;
pub use interaction::*;
pub use scene::*;
