//! Frame compositor: combines the primary clip, overlay, text, and
//! subtitle into the drawing surface.
//!
//! [`compose`] is a pure function of its inputs. The caller holds whatever
//! lock protects the scene for the whole call, so a frame never mixes two
//! scene versions.

use image::{Rgba, RgbaImage};

use lumacut_project_model::{EditParameters, LayerTransform};

use crate::filters::apply_filters;
use crate::surface::{blend_over, fill_rect, Surface};
use crate::text::{TextRasterizer, TextStyle};

/// Text layer size at scale 1.
pub const TEXT_BASE_PX: f32 = 64.0;
/// Subtitle size.
pub const SUBTITLE_PX: f32 = 36.0;
/// Subtitle baseline area, as a fraction of the surface height.
pub const SUBTITLE_Y: f32 = 0.9;

const OVERLAY_SHADOW_OFFSET: i64 = 6;
const OVERLAY_SHADOW: Rgba<u8> = Rgba([0, 0, 0, 90]);
const OVERLAY_OUTLINE: Rgba<u8> = Rgba([0, 170, 255, 255]);
const OVERLAY_OUTLINE_WIDTH: u32 = 2;

const TEXT_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_STROKE: Rgba<u8> = Rgba([0, 0, 0, 255]);
const SUBTITLE_FILL: Rgba<u8> = Rgba([255, 230, 0, 255]);
const SUBTITLE_SHADOW: Rgba<u8> = Rgba([0, 0, 0, 200]);

/// Everything one frame is drawn from.
#[derive(Debug, Clone, Copy)]
pub struct CompositionInputs<'a> {
    /// Target surface size.
    pub width: u32,
    pub height: u32,
    /// Current primary frame, if one is ready.
    pub primary: Option<&'a RgbaImage>,
    /// Current overlay frame, if an overlay is set and ready.
    pub overlay: Option<&'a RgbaImage>,
    pub params: &'a EditParameters,
    pub overlay_transform: &'a LayerTransform,
    pub text_transform: &'a LayerTransform,
    /// Caption text when the text layer is enabled.
    pub text: Option<&'a str>,
    /// Text of the subtitle cue active at the primary position.
    pub cue: Option<&'a str>,
    /// Draw the overlay selection outline.
    pub show_overlay_outline: bool,
    /// Font for text and subtitles; without one both layers are skipped.
    pub rasterizer: Option<&'a TextRasterizer>,
}

/// Redraw the whole surface from `inputs`.
pub fn compose(surface: &mut Surface, inputs: &CompositionInputs<'_>) {
    surface.ensure_size(inputs.width, inputs.height);
    surface.clear_black();

    if let Some(primary) = inputs.primary {
        draw_primary(surface.image_mut(), primary, inputs.params);
    }

    if let Some(overlay) = inputs.overlay {
        draw_overlay(
            surface.image_mut(),
            overlay,
            inputs.overlay_transform,
            inputs.show_overlay_outline,
        );
    }

    if let Some(rasterizer) = inputs.rasterizer {
        if let Some(text) = inputs.text {
            draw_text(surface.image_mut(), rasterizer, text, inputs.text_transform);
        }
        if let Some(cue) = inputs.cue {
            draw_subtitle(surface.image_mut(), rasterizer, cue);
        }
    }
}

/// Scale the primary to the surface, apply zoom/rotation about the centre,
/// run the color filters, then blend with the global opacity.
fn draw_primary(canvas: &mut RgbaImage, source: &RgbaImage, params: &EditParameters) {
    let (w, h) = canvas.dimensions();
    let mut layer = if params.is_identity_transform() && source.dimensions() == (w, h) {
        source.clone()
    } else {
        transform_layer(source, w, h, params.zoom, params.rotate)
    };

    apply_filters(&mut layer, params);

    let alpha = params.alpha() as f32;
    if alpha <= 0.0 {
        return;
    }
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        blend_over(dst, *src, alpha);
    }
}

/// Inverse-mapped nearest sampling of `source` stretched to `w × h`, zoomed
/// by `zoom` and rotated by `rotate_deg` about the centre. Pixels that map
/// outside the source stay transparent.
fn transform_layer(source: &RgbaImage, w: u32, h: u32, zoom: f64, rotate_deg: f64) -> RgbaImage {
    let (sw, sh) = source.dimensions();
    let mut layer = RgbaImage::new(w, h);
    if sw == 0 || sh == 0 {
        return layer;
    }

    let zoom = if zoom > 0.0 { zoom } else { 1.0 };
    let (sin, cos) = rotate_deg.to_radians().sin_cos();
    let (half_w, half_h) = (w as f64 / 2.0, h as f64 / 2.0);
    let (sx, sy) = (sw as f64 / w as f64, sh as f64 / h as f64);

    for (x, y, pixel) in layer.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - half_w;
        let dy = y as f64 + 0.5 - half_h;
        let ux = (dx * cos + dy * sin) / zoom + half_w;
        let uy = (-dx * sin + dy * cos) / zoom + half_h;
        let u = (ux * sx).floor();
        let v = (uy * sy).floor();
        if u < 0.0 || v < 0.0 || u >= sw as f64 || v >= sh as f64 {
            continue;
        }
        *pixel = *source.get_pixel(u as u32, v as u32);
    }

    layer
}

/// Picture-in-picture: `surface_width * scale` wide, aspect preserved, top-left
/// at the transform position.
///
/// Only the part of the target rectangle that lands on the canvas is visited;
/// each visible pixel samples the overlay at its inverse-mapped position.
fn draw_overlay(
    canvas: &mut RgbaImage,
    overlay: &RgbaImage,
    transform: &LayerTransform,
    outline: bool,
) {
    let (cw, ch) = canvas.dimensions();
    let (ow, oh) = overlay.dimensions();
    if ow == 0 || oh == 0 {
        return;
    }

    let target_w = (cw as f64 * transform.scale).round().max(1.0);
    let target_h = (target_w * oh as f64 / ow as f64).round().max(1.0);
    // Float-to-int casts saturate; the rectangles below are clipped anyway.
    let (tw, th) = (target_w as u32, target_h as u32);
    let (px, py) = transform.to_pixels(cw, ch);
    let (x0, y0) = (px.round() as i64, py.round() as i64);

    fill_rect(
        canvas,
        x0 + OVERLAY_SHADOW_OFFSET,
        y0 + OVERLAY_SHADOW_OFFSET,
        tw,
        th,
        OVERLAY_SHADOW,
    );

    let (sx, sy) = (ow as f64 / target_w, oh as f64 / target_h);
    let (x_start, x_end) = (x0.max(0), (x0 + tw as i64).min(cw as i64));
    let (y_start, y_end) = (y0.max(0), (y0 + th as i64).min(ch as i64));
    for cy in y_start..y_end {
        let v = ((((cy - y0) as f64 + 0.5) * sy) as u32).min(oh - 1);
        for cx in x_start..x_end {
            let u = ((((cx - x0) as f64 + 0.5) * sx) as u32).min(ow - 1);
            blend_over(
                canvas.get_pixel_mut(cx as u32, cy as u32),
                *overlay.get_pixel(u, v),
                1.0,
            );
        }
    }

    if outline {
        let t = OVERLAY_OUTLINE_WIDTH;
        let (right, bottom) = (x0 + tw as i64 - t as i64, y0 + th as i64 - t as i64);
        fill_rect(canvas, x0, y0, tw, t, OVERLAY_OUTLINE);
        fill_rect(canvas, x0, bottom, tw, t, OVERLAY_OUTLINE);
        fill_rect(canvas, x0, y0, t, th, OVERLAY_OUTLINE);
        fill_rect(canvas, right, y0, t, th, OVERLAY_OUTLINE);
    }
}

fn draw_text(
    canvas: &mut RgbaImage,
    rasterizer: &TextRasterizer,
    text: &str,
    transform: &LayerTransform,
) {
    let (cw, ch) = canvas.dimensions();
    let px = TEXT_BASE_PX * transform.scale as f32;
    let (cx, cy) = transform.to_pixels(cw, ch);
    let style = TextStyle {
        px,
        fill: TEXT_FILL,
        stroke: Some((TEXT_STROKE, (px / 16.0).round().max(2.0) as u32)),
        shadow: None,
    };
    rasterizer.draw(
        canvas,
        text,
        cx as f32,
        cy as f32,
        transform.rotation as f32,
        &style,
    );
}

fn draw_subtitle(canvas: &mut RgbaImage, rasterizer: &TextRasterizer, cue: &str) {
    let (cw, ch) = canvas.dimensions();
    let style = TextStyle {
        px: SUBTITLE_PX,
        fill: SUBTITLE_FILL,
        stroke: None,
        shadow: Some((SUBTITLE_SHADOW, 2, 2)),
    };
    rasterizer.draw(
        canvas,
        cue,
        cw as f32 / 2.0,
        ch as f32 * SUBTITLE_Y,
        0.0,
        &style,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumacut_project_model::ParamChange;
    use proptest::prelude::*;

    const W: u32 = 16;
    const H: u32 = 9;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 13) as u8, (y * 21) as u8, 77, 255]))
    }

    fn inputs<'a>(
        primary: Option<&'a RgbaImage>,
        overlay: Option<&'a RgbaImage>,
        params: &'a EditParameters,
        overlay_transform: &'a LayerTransform,
        text_transform: &'a LayerTransform,
    ) -> CompositionInputs<'a> {
        CompositionInputs {
            width: W,
            height: H,
            primary,
            overlay,
            params,
            overlay_transform,
            text_transform,
            text: None,
            cue: None,
            show_overlay_outline: false,
            rasterizer: None,
        }
    }

    #[test]
    fn test_neutral_params_copy_primary_exactly() {
        let source = gradient(W, H);
        let params = EditParameters::default();
        let (ot, tt) = (LayerTransform::overlay(), LayerTransform::text());
        let mut surface = Surface::new(W, H);
        compose(&mut surface, &inputs(Some(&source), None, &params, &ot, &tt));
        assert_eq!(surface.image(), &source);
    }

    #[test]
    fn test_primary_is_stretched_to_surface() {
        let source = RgbaImage::from_pixel(4, 3, Rgba([9, 8, 7, 255]));
        let params = EditParameters::default();
        let (ot, tt) = (LayerTransform::overlay(), LayerTransform::text());
        let mut surface = Surface::new(W, H);
        compose(&mut surface, &inputs(Some(&source), None, &params, &ot, &tt));
        assert!(surface.image().pixels().all(|p| p.0 == [9, 8, 7, 255]));
    }

    #[test]
    fn test_empty_scene_is_black() {
        let params = EditParameters::default();
        let (ot, tt) = (LayerTransform::overlay(), LayerTransform::text());
        let mut surface = Surface::new(W, H);
        surface.image_mut().put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        compose(&mut surface, &inputs(None, None, &params, &ot, &tt));
        assert!(surface.image().pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_opacity_blends_over_black() {
        let source = RgbaImage::from_pixel(W, H, Rgba([200, 100, 50, 255]));
        let mut params = EditParameters::default();
        params.apply(ParamChange::Opacity(50.0));
        let (ot, tt) = (LayerTransform::overlay(), LayerTransform::text());
        let mut surface = Surface::new(W, H);
        compose(&mut surface, &inputs(Some(&source), None, &params, &ot, &tt));
        assert_eq!(surface.image().get_pixel(3, 3).0, [100, 50, 25, 255]);
    }

    #[test]
    fn test_zoom_magnifies_centre() {
        let source = gradient(W, H);
        let mut params = EditParameters::default();
        params.apply(ParamChange::Zoom(2.0));
        let (ot, tt) = (LayerTransform::overlay(), LayerTransform::text());
        let mut surface = Surface::new(W, H);
        compose(&mut surface, &inputs(Some(&source), None, &params, &ot, &tt));
        // Corner now shows the source pixel a quarter of the way in.
        assert_eq!(surface.image().get_pixel(0, 0), source.get_pixel(4, 2));
    }

    #[test]
    fn test_rotation_by_half_turn_flips() {
        let source = gradient(W, H);
        let mut params = EditParameters::default();
        params.apply(ParamChange::Rotate(180.0));
        let (ot, tt) = (LayerTransform::overlay(), LayerTransform::text());
        let mut surface = Surface::new(W, H);
        compose(&mut surface, &inputs(Some(&source), None, &params, &ot, &tt));
        assert_eq!(surface.image().get_pixel(0, 0), source.get_pixel(W - 1, H - 1));
        assert_eq!(surface.image().get_pixel(W - 1, 0), source.get_pixel(0, H - 1));
    }

    #[test]
    fn test_overlay_size_and_position() {
        let primary = RgbaImage::from_pixel(W, H, Rgba([0, 0, 255, 255]));
        let overlay = RgbaImage::from_pixel(8, 4, Rgba([0, 255, 0, 255]));
        let params = EditParameters::default();
        let mut ot = LayerTransform::overlay();
        ot.set_position(0.25, 0.0);
        ot.set_scale(0.5).unwrap();
        let tt = LayerTransform::text();
        let mut surface = Surface::new(W, H);
        compose(&mut surface, &inputs(Some(&primary), Some(&overlay), &params, &ot, &tt));

        // 8 px wide, 4 px tall, starting at x = 4.
        let img = surface.image();
        assert_eq!(img.get_pixel(4, 0).0, [0, 255, 0, 255]);
        assert_eq!(img.get_pixel(11, 3).0, [0, 255, 0, 255]);
        assert_eq!(img.get_pixel(3, 0).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(12, 0).0, [0, 0, 255, 255]);
        // Shadow darkens the primary below-right of the overlay.
        let shadowed = img.get_pixel(12, 7).0;
        assert!(shadowed[2] < 255);
    }

    #[test]
    fn test_overlay_outline_only_when_requested() {
        let overlay = RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 255]));
        let params = EditParameters::default();
        let mut ot = LayerTransform::overlay();
        ot.set_position(0.0, 0.0);
        ot.set_scale(0.5).unwrap();
        let tt = LayerTransform::text();

        let mut plain = Surface::new(W, H);
        compose(&mut plain, &inputs(None, Some(&overlay), &params, &ot, &tt));
        assert_eq!(plain.image().get_pixel(0, 0).0, [0, 255, 0, 255]);

        let mut selected = Surface::new(W, H);
        let mut with_outline = inputs(None, Some(&overlay), &params, &ot, &tt);
        with_outline.show_overlay_outline = true;
        compose(&mut selected, &with_outline);
        assert_eq!(selected.image().get_pixel(0, 0).0, OVERLAY_OUTLINE.0);
        assert_eq!(selected.image().get_pixel(3, 3).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_overlay_is_sampled_down_to_target() {
        let overlay = RgbaImage::from_fn(16, 8, |x, _| {
            if x < 8 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        });
        let params = EditParameters::default();
        let mut ot = LayerTransform::overlay();
        ot.set_position(0.0, 0.0);
        ot.set_scale(0.5).unwrap();
        let tt = LayerTransform::text();
        let mut surface = Surface::new(W, H);
        compose(&mut surface, &inputs(None, Some(&overlay), &params, &ot, &tt));

        let img = surface.image();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(4, 0).0, [0, 255, 0, 255]);
        assert_eq!(img.get_pixel(7, 3).0, [0, 255, 0, 255]);
        assert_eq!(img.get_pixel(8, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_tall_overlay_is_clipped_to_surface() {
        let primary = RgbaImage::from_pixel(W, H, Rgba([0, 0, 255, 255]));
        let overlay = RgbaImage::from_pixel(1, 4000, Rgba([0, 255, 0, 255]));
        let params = EditParameters::default();
        let mut ot = LayerTransform::overlay();
        ot.set_position(0.0, 0.0);
        ot.set_scale(0.3).unwrap();
        let tt = LayerTransform::text();
        let mut surface = Surface::new(W, H);
        let mut scene = inputs(Some(&primary), Some(&overlay), &params, &ot, &tt);
        scene.show_overlay_outline = true;
        compose(&mut surface, &scene);

        // 5 px wide, many thousand px tall: a column down the left edge.
        let img = surface.image();
        assert_eq!(surface.dimensions(), (W, H));
        assert_eq!(img.get_pixel(2, H - 1).0, [0, 255, 0, 255]);
        assert_eq!(img.get_pixel(0, H - 1).0, OVERLAY_OUTLINE.0);
        assert_eq!(img.get_pixel(W - 1, 0).0, [0, 0, 255, 255]);
        assert!(img.get_pixel(6, H - 1).0[2] < 255);
    }

    #[test]
    fn test_surface_is_resized_to_target() {
        let params = EditParameters::default();
        let (ot, tt) = (LayerTransform::overlay(), LayerTransform::text());
        let mut surface = Surface::new(4, 4);
        compose(&mut surface, &inputs(None, None, &params, &ot, &tt));
        assert_eq!(surface.dimensions(), (W, H));
    }

    proptest! {
        #[test]
        fn prop_compose_overwrites_every_pixel(
            brightness in 0.0f64..=200.0,
            contrast in 0.0f64..=200.0,
            saturation in 0.0f64..=200.0,
            blur in 0.0f64..=20.0,
            opacity in 0.0f64..=100.0,
            zoom in 1.0f64..=3.0,
            rotate in -180.0f64..=180.0,
        ) {
            let mut params = EditParameters::default();
            for change in [
                ParamChange::Brightness(brightness),
                ParamChange::Contrast(contrast),
                ParamChange::Saturation(saturation),
                ParamChange::Blur(blur),
                ParamChange::Opacity(opacity),
                ParamChange::Zoom(zoom),
                ParamChange::Rotate(rotate),
            ] {
                params.apply(change);
            }
            let source = RgbaImage::from_pixel(8, 8, Rgba([100, 100, 100, 255]));
            let (ot, tt) = (LayerTransform::overlay(), LayerTransform::text());
            let mut surface = Surface::new(W, H);
            for p in surface.image_mut().pixels_mut() {
                *p = Rgba([255, 0, 255, 7]);
            }
            compose(&mut surface, &inputs(Some(&source), None, &params, &ot, &tt));
            prop_assert!(surface
                .image()
                .pixels()
                .all(|p| p.0[3] == 255 && p.0 != [255, 0, 255, 255]));
        }
    }
}
