//! LumaCut Common Utilities
//!
//! Shared infrastructure for all LumaCut crates:
//! - Error types and result aliases
//! - Frame pacing utilities for the render loop and export sampler
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
