use crate::config::{ColorScheme, FilterValues};

const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// Filter percentages resolved into blend factors, with the VHS profile's
/// adjustments folded in.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ResolvedFilters {
    brightness: f64,
    contrast: f64,
    saturate: f64,
    grayscale: f64,
    sepia: f64,
    invert: f64,
}

fn resolve(filters: &FilterValues, scheme: ColorScheme) -> ResolvedFilters {
    let mut brightness = filters.brightness.max(0.0) / 100.0;
    let mut contrast = filters.contrast.max(0.0) / 100.0;
    let mut saturate = filters.saturate.max(0.0) / 100.0;
    let grayscale = (filters.grayscale / 100.0).clamp(0.0, 1.0);
    let mut sepia = (filters.sepia / 100.0).clamp(0.0, 1.0);
    let invert = (filters.invert / 100.0).clamp(0.0, 1.0);

    if scheme == ColorScheme::Vhs {
        brightness *= 0.9;
        contrast *= 1.2;
        saturate *= 1.4;
        sepia = sepia.max(0.3);
    }

    ResolvedFilters {
        brightness,
        contrast,
        saturate,
        grayscale,
        sepia,
        invert,
    }
}

/// Returns true when the pipeline would leave every pixel untouched.
pub fn is_identity(filters: &FilterValues, scheme: ColorScheme) -> bool {
    let f = resolve(filters, scheme);
    scheme != ColorScheme::Vhs
        && f == ResolvedFilters {
            brightness: 1.0,
            contrast: 1.0,
            saturate: 1.0,
            grayscale: 0.0,
            sepia: 0.0,
            invert: 0.0,
        }
}

/// Apply the fixed-order color pipeline to an RGBA8 buffer in place:
/// brightness, contrast (remapped around 128), saturation toward luma,
/// grayscale toward luma, sepia toward the sepia matrix, invert toward the
/// channel complement. Alpha is left untouched.
pub fn apply_filters(data: &mut [u8], filters: &FilterValues, scheme: ColorScheme) {
    debug_assert!(data.len().is_multiple_of(4));
    let f = resolve(filters, scheme);
    let contrast_intercept = 128.0 * (1.0 - f.contrast);

    for px in data.chunks_exact_mut(4) {
        let mut r = f64::from(px[0]);
        let mut g = f64::from(px[1]);
        let mut b = f64::from(px[2]);

        r *= f.brightness;
        g *= f.brightness;
        b *= f.brightness;

        r = r * f.contrast + contrast_intercept;
        g = g * f.contrast + contrast_intercept;
        b = b * f.contrast + contrast_intercept;

        let luma = LUMA_R * r + LUMA_G * g + LUMA_B * b;
        r = luma + (r - luma) * f.saturate;
        g = luma + (g - luma) * f.saturate;
        b = luma + (b - luma) * f.saturate;

        if f.grayscale > 0.0 {
            let gray = LUMA_R * r + LUMA_G * g + LUMA_B * b;
            r = r * (1.0 - f.grayscale) + gray * f.grayscale;
            g = g * (1.0 - f.grayscale) + gray * f.grayscale;
            b = b * (1.0 - f.grayscale) + gray * f.grayscale;
        }

        if f.sepia > 0.0 {
            let sr = r * 0.393 + g * 0.769 + b * 0.189;
            let sg = r * 0.349 + g * 0.686 + b * 0.168;
            let sb = r * 0.272 + g * 0.534 + b * 0.131;
            r = r * (1.0 - f.sepia) + sr * f.sepia;
            g = g * (1.0 - f.sepia) + sg * f.sepia;
            b = b * (1.0 - f.sepia) + sb * f.sepia;
        }

        if f.invert > 0.0 {
            r = r * (1.0 - f.invert) + (255.0 - r) * f.invert;
            g = g * (1.0 - f.invert) + (255.0 - g) * f.invert;
            b = b * (1.0 - f.invert) + (255.0 - b) * f.invert;
        }

        px[0] = clamp_channel(r);
        px[1] = clamp_channel(g);
        px[2] = clamp_channel(b);
    }
}

const SCAN_BAND_ALPHA: f64 = 0.08;
const VIGNETTE_GLOBAL_ALPHA: f64 = 0.2;
const VIGNETTE_EDGE_ALPHA: f64 = 0.65;
const VIGNETTE_INNER_RADIUS: f64 = 0.75;

/// Composite the VHS overlay: black scan bands on every other row, plus a
/// radial vignette darkening toward the edges.
pub fn apply_vhs_overlay(data: &mut [u8], width: u32, height: u32) {
    debug_assert_eq!(data.len(), width as usize * height as usize * 4);

    for y in (0..height as usize).step_by(2) {
        let row = &mut data[y * width as usize * 4..(y + 1) * width as usize * 4];
        for px in row.chunks_exact_mut(4) {
            for c in &mut px[..3] {
                *c = clamp_channel(f64::from(*c) * (1.0 - SCAN_BAND_ALPHA));
            }
        }
    }

    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;
    let radius = f64::from(width.max(height)) / 2.0;
    for y in 0..height as usize {
        for x in 0..width as usize {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let d = (dx * dx + dy * dy).sqrt() / radius;
            if d <= VIGNETTE_INNER_RADIUS {
                continue;
            }
            let ramp = ((d - VIGNETTE_INNER_RADIUS) / (1.0 - VIGNETTE_INNER_RADIUS)).min(1.0);
            let alpha = VIGNETTE_GLOBAL_ALPHA * VIGNETTE_EDGE_ALPHA * ramp;
            let px = &mut data[(y * width as usize + x) * 4..][..4];
            for c in &mut px[..3] {
                *c = clamp_channel(f64::from(*c) * (1.0 - alpha));
            }
        }
    }
}

fn clamp_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
