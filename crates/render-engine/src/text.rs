//! Text rasterization for the caption and subtitle layers.
//!
//! A single bold font is loaded once per editor. Text is laid out on one
//! line into a coverage mask, painted into a transparent layer (shadow,
//! stroke, fill), and then blended onto the surface rotated about its
//! centre. The most recently painted layers are kept, so an unchanged
//! caption or cue costs only the final blend.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use lumacut_common::error::{LumacutError, LumacutResult};

use crate::surface::blend_over;

/// Well-known locations of a bold sans-serif font.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Painted layers kept for reuse.
const LAYER_CACHE_SLOTS: usize = 4;

/// How a run of text is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub px: f32,
    pub fill: Rgba<u8>,
    /// Outline color and width in pixels. The outline follows the glyphs'
    /// square-window dilation.
    pub stroke: Option<(Rgba<u8>, u32)>,
    /// Shadow color and offset in pixels.
    pub shadow: Option<(Rgba<u8>, i32, i32)>,
}

/// A loaded font plus the painting routines that use it.
///
/// Clones share the font and the layer cache.
#[derive(Clone)]
pub struct TextRasterizer {
    font: FontArc,
    source: PathBuf,
    layers: Arc<Mutex<VecDeque<CachedLayer>>>,
}

struct CachedLayer {
    text: String,
    style: TextStyle,
    layer: Arc<RgbaImage>,
}

impl std::fmt::Debug for TextRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRasterizer")
            .field("source", &self.source)
            .finish()
    }
}

impl TextRasterizer {
    /// Load the configured font, falling back to system locations.
    pub fn load(configured: Option<&Path>) -> LumacutResult<Self> {
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONT_PATHS.iter().map(PathBuf::from));

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(rasterizer) => {
                    tracing::debug!(font = %path.display(), "Loaded text font");
                    return Ok(rasterizer);
                }
                Err(e) => tracing::debug!(font = %path.display(), error = %e, "Skipping font"),
            }
        }

        Err(LumacutError::render(
            "No usable font found; set editor.font_path in the config",
        ))
    }

    /// Load the font, logging a single warning and returning `None` when no
    /// font is available so text layers can be skipped.
    pub fn load_or_warn(configured: Option<&Path>) -> Option<Self> {
        match Self::load(configured) {
            Ok(rasterizer) => Some(rasterizer),
            Err(e) => {
                tracing::warn!(error = %e, "Text and subtitle layers disabled");
                None
            }
        }
    }

    pub fn from_file(path: &Path) -> LumacutResult<Self> {
        let bytes = std::fs::read(path)?;
        let mut rasterizer = Self::from_bytes(bytes)?;
        rasterizer.source = path.to_path_buf();
        Ok(rasterizer)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> LumacutResult<Self> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| LumacutError::render(format!("Invalid font data: {e}")))?;
        Ok(Self {
            font,
            source: PathBuf::from("<memory>"),
            layers: Arc::new(Mutex::new(VecDeque::with_capacity(LAYER_CACHE_SLOTS))),
        })
    }

    /// Path the font was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Width and height of `text` set on one line at `px`.
    pub fn measure(&self, text: &str, px: f32) -> (u32, u32) {
        let mask = self.coverage(text, px, 0);
        (mask.width, mask.height)
    }

    /// Paint `text` centred on `(cx, cy)` and rotated by `rotation_deg`
    /// (clockwise, screen coordinates).
    pub fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        cx: f32,
        cy: f32,
        rotation_deg: f32,
        style: &TextStyle,
    ) {
        if text.trim().is_empty() || !(style.px > 0.0) {
            return;
        }
        let layer = self.layer(text, style);
        blit_rotated(canvas, &layer, cx, cy, rotation_deg);
    }

    /// Painted layer for `text`, reused while text and style stay the same.
    fn layer(&self, text: &str, style: &TextStyle) -> Arc<RgbaImage> {
        {
            let mut cache = lock(&self.layers);
            let hit = cache
                .iter()
                .position(|c| c.text == text && c.style == *style);
            if let Some(cached) = hit.and_then(|i| cache.remove(i)) {
                let layer = Arc::clone(&cached.layer);
                cache.push_front(cached);
                return layer;
            }
        }

        let layer = Arc::new(self.paint_layer(text, style));
        let mut cache = lock(&self.layers);
        cache.push_front(CachedLayer {
            text: text.to_string(),
            style: *style,
            layer: Arc::clone(&layer),
        });
        cache.truncate(LAYER_CACHE_SLOTS);
        layer
    }

    fn paint_layer(&self, text: &str, style: &TextStyle) -> RgbaImage {
        let stroke_w = style.stroke.map(|(_, w)| w).unwrap_or(0);
        let (sdx, sdy) = style.shadow.map(|(_, dx, dy)| (dx, dy)).unwrap_or((0, 0));
        let pad = stroke_w + sdx.unsigned_abs().max(sdy.unsigned_abs());
        let mask = self.coverage(text, style.px, pad);

        let mut layer = RgbaImage::new(mask.width, mask.height);

        if let Some((color, dx, dy)) = style.shadow {
            for y in 0..mask.height {
                for x in 0..mask.width {
                    let sx = x as i64 - dx as i64;
                    let sy = y as i64 - dy as i64;
                    let cov = mask.get(sx, sy);
                    if cov > 0.0 {
                        paint(layer.get_pixel_mut(x, y), color, cov);
                    }
                }
            }
        }

        if let Some((color, width)) = style.stroke {
            let outline = mask.dilate(width);
            for y in 0..mask.height {
                for x in 0..mask.width {
                    let cov = outline.get(x as i64, y as i64);
                    if cov > 0.0 {
                        paint(layer.get_pixel_mut(x, y), color, cov);
                    }
                }
            }
        }

        for y in 0..mask.height {
            for x in 0..mask.width {
                let cov = mask.get(x as i64, y as i64);
                if cov > 0.0 {
                    paint(layer.get_pixel_mut(x, y), style.fill, cov);
                }
            }
        }

        layer
    }

    /// Lay out `text` on one line and rasterize glyph coverage, with `pad`
    /// empty pixels on every side.
    fn coverage(&self, text: &str, px: f32, pad: u32) -> Coverage {
        let scale = PxScale::from(px);
        let scaled = self.font.as_scaled(scale);

        let mut glyphs = Vec::new();
        let mut caret = 0.0f32;
        let mut previous = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(caret, scaled.ascent())));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }

        let text_w = caret.ceil().max(1.0) as u32;
        let text_h = (scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32;
        let width = text_w + pad * 2;
        let height = text_h + pad * 2;
        let mut values = vec![0.0f32; width as usize * height as usize];

        for glyph in glyphs {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, cov| {
                let x = bounds.min.x as i64 + gx as i64 + pad as i64;
                let y = bounds.min.y as i64 + gy as i64 + pad as i64;
                if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                    return;
                }
                let idx = y as usize * width as usize + x as usize;
                values[idx] = (values[idx] + cov).min(1.0);
            });
        }

        Coverage {
            width,
            height,
            values,
        }
    }
}

struct Coverage {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Coverage {
    fn get(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Maximum over a `(2r + 1)` square window, as a row pass followed by a
    /// column pass.
    fn dilate(&self, r: u32) -> Coverage {
        let (w, h, r) = (self.width as usize, self.height as usize, r as usize);
        let mut rows = vec![0.0f32; w * h];
        for (src, dst) in self.values.chunks(w).zip(rows.chunks_mut(w)) {
            sliding_max(src, r, dst);
        }

        let mut values = vec![0.0f32; w * h];
        let mut column = vec![0.0f32; h];
        let mut dilated = vec![0.0f32; h];
        for x in 0..w {
            for (y, v) in column.iter_mut().enumerate() {
                *v = rows[y * w + x];
            }
            sliding_max(&column, r, &mut dilated);
            for (y, v) in dilated.iter().enumerate() {
                values[y * w + x] = *v;
            }
        }

        Coverage {
            width: self.width,
            height: self.height,
            values,
        }
    }
}

/// `out[i]` is the maximum of `input[i - r..=i + r]`, clipped to the slice.
/// Linear in the slice length whatever the radius.
fn sliding_max(input: &[f32], r: usize, out: &mut [f32]) {
    // Indices whose values decrease from front to back.
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut next = 0;
    for i in 0..input.len() {
        let hi = (i + r).min(input.len() - 1);
        while next <= hi {
            while window.back().is_some_and(|&j| input[j] <= input[next]) {
                window.pop_back();
            }
            window.push_back(next);
            next += 1;
        }
        let lo = i.saturating_sub(r);
        while window.front().is_some_and(|&j| j < lo) {
            window.pop_front();
        }
        out[i] = window.front().map_or(0.0, |&j| input[j]);
    }
}

/// Source-over onto a possibly transparent layer pixel.
fn paint(dst: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let src_a = (color.0[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    let dst_a = dst.0[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let v = (color.0[c] as f32 * src_a + dst.0[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst.0[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round() as u8;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Blend `layer` onto `canvas`, centred on `(cx, cy)` and rotated.
fn blit_rotated(canvas: &mut RgbaImage, layer: &RgbaImage, cx: f32, cy: f32, rotation_deg: f32) {
    let (lw, lh) = (layer.width() as f32, layer.height() as f32);
    let theta = rotation_deg.to_radians();
    let (sin, cos) = theta.sin_cos();

    // Bounding box of the rotated layer on the canvas.
    let half_w = (lw * cos.abs() + lh * sin.abs()) / 2.0;
    let half_h = (lw * sin.abs() + lh * cos.abs()) / 2.0;
    let x0 = (cx - half_w).floor().max(0.0) as u32;
    let y0 = (cy - half_h).floor().max(0.0) as u32;
    let x1 = ((cx + half_w).ceil().max(0.0) as u32).min(canvas.width());
    let y1 = ((cy + half_h).ceil().max(0.0) as u32).min(canvas.height());

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            // Inverse rotation back into layer space.
            let lx = dx * cos + dy * sin + lw / 2.0;
            let ly = -dx * sin + dy * cos + lh / 2.0;
            if lx < 0.0 || ly < 0.0 || lx >= lw || ly >= lh {
                continue;
            }
            let src = *layer.get_pixel(lx as u32, ly as u32);
            blend_over(canvas.get_pixel_mut(x, y), src, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system_rasterizer() -> Option<TextRasterizer> {
        TextRasterizer::load(None).ok()
    }

    #[test]
    fn test_invalid_font_bytes_are_rejected() {
        let err = TextRasterizer::from_bytes(vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, LumacutError::Render { .. }));
    }

    #[test]
    fn test_missing_configured_font_falls_back() {
        let loaded = TextRasterizer::load(Some(Path::new("/nope/missing.ttf")));
        if let Ok(r) = loaded {
            assert_ne!(r.source(), Path::new("/nope/missing.ttf"));
        }
    }

    #[test]
    fn test_paint_over_transparent() {
        let mut px = Rgba([0, 0, 0, 0]);
        paint(&mut px, Rgba([255, 255, 255, 255]), 1.0);
        assert_eq!(px, Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_blit_rotated_identity_centres_layer() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let layer = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
        blit_rotated(&mut canvas, &layer, 5.0, 5.0, 0.0);
        assert_eq!(canvas.get_pixel(3, 4).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(6, 5).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(2, 4).0, [0, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(3, 6).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_blit_rotated_quarter_turn_swaps_extent() {
        let mut canvas = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let layer = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
        blit_rotated(&mut canvas, &layer, 5.0, 5.0, 90.0);
        assert_eq!(canvas.get_pixel(4, 3).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(5, 6).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(3, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_dilate_matches_window_maximum() {
        let (width, height) = (9u32, 7u32);
        let values: Vec<f32> = (0..width * height)
            .map(|i| ((i * 37 % 11) as f32) / 10.0)
            .collect();
        let mask = Coverage {
            width,
            height,
            values,
        };

        for r in 0..4i64 {
            let dilated = mask.dilate(r as u32);
            for y in 0..height as i64 {
                for x in 0..width as i64 {
                    let mut expected = 0.0f32;
                    for oy in -r..=r {
                        for ox in -r..=r {
                            expected = expected.max(mask.get(x + ox, y + oy));
                        }
                    }
                    assert_eq!(dilated.get(x, y), expected, "r={r} at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn test_dilate_grows_a_single_dot() {
        let mut mask = Coverage {
            width: 7,
            height: 7,
            values: vec![0.0; 49],
        };
        mask.values[3 * 7 + 3] = 0.5;
        let dilated = mask.dilate(2);
        assert_eq!(dilated.get(1, 1), 0.5);
        assert_eq!(dilated.get(5, 5), 0.5);
        assert_eq!(dilated.get(0, 3), 0.0);
        assert_eq!(dilated.get(3, 6), 0.0);
    }

    #[test]
    fn test_unchanged_text_reuses_painted_layer() {
        let Some(r) = system_rasterizer() else {
            return;
        };
        let style = TextStyle {
            px: 40.0,
            fill: Rgba([255, 255, 255, 255]),
            stroke: Some((Rgba([0, 0, 0, 255]), 3)),
            shadow: None,
        };
        let first = r.layer("Hello", &style);
        assert!(Arc::ptr_eq(&first, &r.layer("Hello", &style)));

        // Clones share the cache.
        assert!(Arc::ptr_eq(&first, &r.clone().layer("Hello", &style)));

        assert!(!Arc::ptr_eq(&first, &r.layer("Hello!", &style)));
        let bigger = TextStyle { px: 41.0, ..style };
        assert!(!Arc::ptr_eq(&first, &r.layer("Hello", &bigger)));
    }

    #[test]
    fn test_layer_cache_is_bounded() {
        let Some(r) = system_rasterizer() else {
            return;
        };
        let style = TextStyle {
            px: 20.0,
            fill: Rgba([255, 255, 255, 255]),
            stroke: None,
            shadow: None,
        };
        let first = r.layer("cue 0", &style);
        for i in 1..=LAYER_CACHE_SLOTS {
            r.layer(&format!("cue {i}"), &style);
        }
        assert_eq!(lock(&r.layers).len(), LAYER_CACHE_SLOTS);
        assert!(!Arc::ptr_eq(&first, &r.layer("cue 0", &style)));
    }

    #[test]
    fn test_large_outlined_caption_draws_within_budget() {
        let Some(r) = system_rasterizer() else {
            return;
        };
        // Caption at scale 4 on a 1280x720 surface.
        let px = 64.0 * 4.0;
        let style = TextStyle {
            px,
            fill: Rgba([255, 255, 255, 255]),
            stroke: Some((Rgba([0, 0, 0, 255]), (px / 16.0) as u32)),
            shadow: None,
        };
        let mut canvas = RgbaImage::from_pixel(1280, 720, Rgba([40, 40, 40, 255]));

        let started = std::time::Instant::now();
        r.draw(&mut canvas, "Caption text", 640.0, 360.0, 15.0, &style);
        let first = started.elapsed();
        assert!(first < std::time::Duration::from_secs(1), "first draw took {first:?}");

        let started = std::time::Instant::now();
        for _ in 0..10 {
            r.draw(&mut canvas, "Caption text", 640.0, 360.0, 15.0, &style);
        }
        let repeated = started.elapsed();
        assert!(
            repeated < std::time::Duration::from_secs(2),
            "ten cached draws took {repeated:?}"
        );
        assert!(canvas.pixels().any(|p| p.0 == [255, 255, 255, 255]));
        assert!(canvas.pixels().any(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_marks_pixels_when_font_available() {
        let Some(r) = system_rasterizer() else {
            return;
        };
        let mut canvas = RgbaImage::from_pixel(200, 80, Rgba([0, 0, 0, 255]));
        let style = TextStyle {
            px: 40.0,
            fill: Rgba([255, 255, 255, 255]),
            stroke: Some((Rgba([0, 0, 0, 255]), 2)),
            shadow: None,
        };
        r.draw(&mut canvas, "Hi", 100.0, 40.0, 0.0, &style);
        assert!(canvas.pixels().any(|p| p.0[0] > 200));
        let (w, h) = r.measure("Hi", 40.0);
        assert!(w > 0 && h > 0);
    }
}
