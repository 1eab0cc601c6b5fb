//! Placement of the overlay and text layers.
//!
//! Both layers store normalized positions: `(0.0, 0.0)` is the top-left of
//! the drawing surface and `(1.0, 1.0)` its bottom-right. Pixel positions are
//! obtained with [`LayerTransform::to_pixels`], which multiplies by the
//! surface size. For the overlay the position is its top-left corner; for
//! text it is the anchor the text is centred on.

use serde::{Deserialize, Serialize};

/// Which positioned layer a transform belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Overlay,
    Text,
}

impl LayerKind {
    /// Largest accepted scale. The smallest is always exclusive zero.
    ///
    /// Overlay scale is a fraction of the surface width, so it cannot
    /// exceed 1.
    pub fn max_scale(&self) -> f64 {
        match self {
            LayerKind::Overlay => 1.0,
            LayerKind::Text => 4.0,
        }
    }
}

/// Position, scale, and rotation of a positioned layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerTransform {
    pub kind: LayerKind,
    /// Horizontal position (normalized).
    pub x: f64,
    /// Vertical position (normalized).
    pub y: f64,
    pub scale: f64,
    /// Degrees.
    pub rotation: f64,
}

impl LayerTransform {
    /// Default picture-in-picture placement: top-left area, 30% wide.
    pub fn overlay() -> Self {
        Self {
            kind: LayerKind::Overlay,
            x: 0.05,
            y: 0.05,
            scale: 0.3,
            rotation: 0.0,
        }
    }

    /// Default text placement: centred on the surface.
    pub fn text() -> Self {
        Self {
            kind: LayerKind::Text,
            x: 0.5,
            y: 0.5,
            scale: 1.0,
            rotation: 0.0,
        }
    }

    /// Move the layer, clamping into the surface.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = clamp01(x);
        self.y = clamp01(y);
    }

    /// Set the scale. Values outside `(0, max_scale]` are rejected and leave
    /// the transform unchanged.
    pub fn set_scale(&mut self, scale: f64) -> Result<(), TransformError> {
        let max = self.kind.max_scale();
        if !(scale > 0.0 && scale <= max) {
            return Err(TransformError::ScaleOutOfRange {
                kind: self.kind,
                scale,
                max,
            });
        }
        self.scale = scale;
        Ok(())
    }

    /// Set rotation in degrees, wrapped into `[-180, 180]`.
    pub fn set_rotation(&mut self, degrees: f64) {
        if !degrees.is_finite() {
            return;
        }
        let mut wrapped = degrees % 360.0;
        if wrapped > 180.0 {
            wrapped -= 360.0;
        } else if wrapped < -180.0 {
            wrapped += 360.0;
        }
        self.rotation = wrapped;
    }

    /// Reset scale and rotation to neutral, keeping the position.
    pub fn reset_scale_rotation(&mut self) {
        self.scale = 1.0;
        self.rotation = 0.0;
    }

    /// Position in surface pixels.
    pub fn to_pixels(&self, surface_width: u32, surface_height: u32) -> (f64, f64) {
        (
            self.x * surface_width as f64,
            self.y * surface_height as f64,
        )
    }

    /// Normalized position for a pixel coordinate.
    pub fn normalize(px: f64, py: f64, surface_width: u32, surface_height: u32) -> (f64, f64) {
        let w = surface_width.max(1) as f64;
        let h = surface_height.max(1) as f64;
        (px / w, py / h)
    }
}

/// Errors raised by transform updates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("{kind:?} scale {scale} is outside (0, {max}]")]
    ScaleOutOfRange { kind: LayerKind, scale: f64, max: f64 },
}

fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}
