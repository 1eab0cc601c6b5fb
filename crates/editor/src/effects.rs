//! Cosmetic one-shot effects.
//!
//! These only drive a transient status indicator. They never change edit
//! parameters, pixels, or audio.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A named effect that shows as running for `duration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmeticEffect {
    pub name: String,
    pub duration: Duration,
}

impl CosmeticEffect {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// Built-in effects.
pub fn effect_catalogue() -> Vec<CosmeticEffect> {
    vec![
        CosmeticEffect::new("Magic Enhance", Duration::from_millis(1500)),
        CosmeticEffect::new("Remove Background", Duration::from_millis(2000)),
        CosmeticEffect::new("Auto Subtitles", Duration::from_millis(1200)),
        CosmeticEffect::new("Smart Reframe", Duration::from_millis(1800)),
    ]
}

/// Look up a built-in effect by name, ignoring case.
pub fn find_effect(name: &str) -> Option<CosmeticEffect> {
    effect_catalogue()
        .into_iter()
        .find(|e| e.name.eq_ignore_ascii_case(name))
}
