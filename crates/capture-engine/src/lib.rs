//! LumaCut Capture Engine
//!
//! Records the live drawing surface into a video asset. The export runs in
//! real time: playback restarts from zero, a sampler task copies the
//! surface at the capture rate into a [`FrameEncoder`], and when the
//! primary's duration has elapsed the encoded chunks are written out and
//! registered in the asset store.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               ExportController                 │
//! │  ┌──────────────┐  ┌─────────┐  ┌───────────┐ │
//! │  │ PlaybackDriver│  │ Sampler │  │  Encoder  │ │
//! │  │ (rewind/play) │  │ (30 fps)│─►│ (ffmpeg)  │ │
//! │  └──────────────┘  └────▲────┘  └─────┬─────┘ │
//! │                         │             │       │
//! │                  SharedSurface     chunks     │
//! │                                       ▼       │
//! │                   lumacut-export-<ts>-<q>.webm │
//! │                              │                │
//! │                              ▼                │
//! │                         AssetStore            │
//! └───────────────────────────────────────────────┘
//! ```

pub mod encoder;
pub mod session;

pub use encoder::*;
pub use session::*;
