//! Pointer interaction with the drawing surface.

use lumacut_project_model::{LayerKind, LayerTransform};

use crate::scene::{EditorScene, ToolCategory};

/// Move a layer to a click at surface pixel `(px, py)`.
///
/// - Overlay tool with an overlay set: the overlay's top-left goes to the
///   click point.
/// - Main tool with text enabled: the text is centred on the click point and
///   its scale and rotation are reset.
///
/// Any other combination does nothing. Returns the layer that moved.
pub fn apply_click(
    scene: &mut EditorScene,
    px: f64,
    py: f64,
    surface_width: u32,
    surface_height: u32,
) -> Option<LayerKind> {
    if !px.is_finite() || !py.is_finite() {
        return None;
    }
    let (x, y) = LayerTransform::normalize(px, py, surface_width, surface_height);

    match scene.tool {
        ToolCategory::Overlay if scene.has_overlay() => {
            scene.overlay_transform.set_position(x, y);
            tracing::debug!(x, y, "Overlay moved");
            Some(LayerKind::Overlay)
        }
        ToolCategory::Main if scene.text.enabled => {
            scene.text_transform.set_position(x, y);
            scene.text_transform.reset_scale_rotation();
            tracing::debug!(x, y, "Text moved");
            Some(LayerKind::Text)
        }
        _ => None,
    }
}
