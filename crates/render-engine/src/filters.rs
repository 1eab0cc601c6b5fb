//! Color filters with CSS filter-function semantics.
//!
//! Applied in the fixed order brightness → contrast → saturate → blur.
//! Channel values are clamped to `[0, 1]` after every step, as a chain of
//! CSS filter functions would.

use image::RgbaImage;

use lumacut_project_model::EditParameters;

/// Apply the color filter chain to a layer in place.
///
/// Neutral parameters return without touching the pixels.
pub fn apply_filters(layer: &mut RgbaImage, params: &EditParameters) {
    if params.is_neutral_filter() {
        return;
    }

    let brightness = params.brightness_factor() as f32;
    let contrast = params.contrast_factor() as f32;
    let matrix =
        (params.saturation != 100.0).then(|| saturate_matrix(params.saturation_factor() as f32));
    let needs_color = params.brightness != 100.0
        || params.contrast != 100.0
        || params.saturation != 100.0;

    if needs_color {
        for pixel in layer.pixels_mut() {
            let mut rgb = [
                pixel.0[0] as f32 / 255.0,
                pixel.0[1] as f32 / 255.0,
                pixel.0[2] as f32 / 255.0,
            ];
            for c in rgb.iter_mut() {
                *c = (*c * brightness).clamp(0.0, 1.0);
                *c = ((*c - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
            }
            if let Some(m) = &matrix {
                rgb = apply_matrix(m, rgb);
            }
            for (c, value) in rgb.iter().enumerate() {
                pixel.0[c] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    }

    if params.blur > 0.0 {
        *layer = image::imageops::blur(layer, params.blur as f32);
    }
}

/// The CSS `saturate()` color matrix (rows are output channels).
fn saturate_matrix(s: f32) -> [[f32; 3]; 3] {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn apply_matrix(m: &[[f32; 3]; 3], rgb: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0; 3];
    for (row, value) in m.iter().zip(out.iter_mut()) {
        *value = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use lumacut_project_model::ParamChange;

    fn layer(color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(3, 3, Rgba(color))
    }

    #[test]
    fn test_neutral_is_identity() {
        let mut img = layer([12, 200, 77, 255]);
        apply_filters(&mut img, &EditParameters::default());
        assert_eq!(img.get_pixel(1, 1).0, [12, 200, 77, 255]);
    }

    #[test]
    fn test_brightness_scales_channels() {
        let mut params = EditParameters::default();
        params.apply(ParamChange::Brightness(50.0));
        let mut img = layer([200, 100, 0, 255]);
        apply_filters(&mut img, &params);
        assert_eq!(img.get_pixel(0, 0).0, [100, 50, 0, 255]);
    }

    #[test]
    fn test_zero_contrast_is_mid_gray() {
        let mut params = EditParameters::default();
        params.apply(ParamChange::Contrast(0.0));
        let mut img = layer([10, 250, 90, 255]);
        apply_filters(&mut img, &params);
        assert_eq!(img.get_pixel(2, 2).0, [128, 128, 128, 255]);
    }

    #[test]
    fn test_zero_saturation_is_grayscale() {
        let mut params = EditParameters::default();
        params.apply(ParamChange::Saturation(0.0));
        let mut img = layer([255, 0, 0, 255]);
        apply_filters(&mut img, &params);
        let [r, g, b, a] = img.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(r, 54);
        assert_eq!(a, 255);
    }

    #[test]
    fn test_blur_keeps_dimensions() {
        let mut params = EditParameters::default();
        params.apply(ParamChange::Blur(2.0));
        let mut img = RgbaImage::from_fn(8, 8, |x, _| {
            if x < 4 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        apply_filters(&mut img, &params);
        assert_eq!(img.dimensions(), (8, 8));
        let edge = img.get_pixel(4, 4).0[0];
        assert!(edge > 0 && edge < 255);
    }
}
