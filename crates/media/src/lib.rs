//! LumaCut Media
//!
//! Playable media handles for the editor. A [`MediaBinding`] wraps one
//! [`MediaSource`] with playback state (position, rate, volume); the
//! [`MediaDeck`] keeps the primary and overlay bindings on one timebase.
//!
//! # Architecture
//!
//! ```text
//! Asset ──► SourceResolver ──► Box<dyn MediaSource>
//!                                     │
//!                                     ▼
//!                              MediaBinding (primary) ──┐
//!                              MediaBinding (overlay) ──┴── MediaDeck
//! ```
//!
//! Decoding is lazy: a frame is produced only when the compositor asks for
//! the current position.

pub mod binding;
pub mod deck;
pub mod resolver;
pub mod source;

pub use binding::*;
pub use deck::*;
pub use resolver::*;
pub use source::*;
