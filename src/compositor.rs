use crate::{
    color,
    config::{CaptureConfig, ColorScheme},
    error::ScenecapResult,
    surface::{RawSnapshot, SourceGeometry},
};

/// Fixed-size, fully opaque RGBA8 frame in the encoder's expected layout.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    pub fn filled(width: u32, height: u32, rgb: crate::config::Rgb) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&[rgb.r, rgb.g, rgb.b, 255]);
        }
        Self {
            width,
            height,
            data,
        }
    }
}

/// Crop/scale/letterbox geometry for one session. All quantities derive
/// deterministically from the effective source geometry and the config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    pub visible_width: u32,
    pub visible_height: u32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl FrameLayout {
    pub fn is_empty(&self) -> bool {
        self.scaled_width == 0 || self.scaled_height == 0
    }
}

pub fn compute_layout(geometry: SourceGeometry, config: &CaptureConfig) -> FrameLayout {
    // Degenerate crops clamp to a zero-area visible region; the output is
    // then pure background rather than an error.
    let visible_width = geometry
        .width
        .saturating_sub(config.crop_left.saturating_add(config.crop_right));
    let visible_height = geometry
        .height
        .saturating_sub(config.crop_top.saturating_add(config.crop_bottom));

    if visible_width == 0 || visible_height == 0 {
        return FrameLayout {
            visible_width,
            visible_height,
            scaled_width: 0,
            scaled_height: 0,
            offset_x: 0,
            offset_y: 0,
        };
    }

    let scale = (f64::from(config.target_width) / f64::from(visible_width))
        .min(f64::from(config.target_height) / f64::from(visible_height));
    let scaled_width =
        ((f64::from(visible_width) * scale).floor() as u32).min(config.target_width);
    let scaled_height =
        ((f64::from(visible_height) * scale).floor() as u32).min(config.target_height);

    FrameLayout {
        visible_width,
        visible_height,
        scaled_width,
        scaled_height,
        offset_x: (config.target_width - scaled_width) / 2,
        offset_y: (config.target_height - scaled_height) / 2,
    }
}

/// Composite a raw snapshot into the fixed-size output frame: crop, scale to
/// fit (letterbox/pillarbox with the background color), flatten over the
/// background, then run the color pipeline and the optional VHS overlay.
///
/// Pure: identical inputs yield byte-identical output.
pub fn composite(
    snapshot: &RawSnapshot,
    geometry: SourceGeometry,
    config: &CaptureConfig,
) -> ScenecapResult<FrameRgba> {
    snapshot.validate()?;

    let layout = compute_layout(geometry, config);
    let mut frame = FrameRgba::filled(config.target_width, config.target_height, config.background);

    if !layout.is_empty() {
        draw_scaled(&mut frame, snapshot, &layout, config);
    }

    let filters = config.color_scheme.forced_filters(config.filters);
    if !color::is_identity(&filters, config.color_scheme) {
        color::apply_filters(&mut frame.data, &filters, config.color_scheme);
    }
    if config.color_scheme == ColorScheme::Vhs {
        color::apply_vhs_overlay(&mut frame.data, frame.width, frame.height);
    }

    Ok(frame)
}

/// Bilinear-sample the cropped source region into the destination rectangle,
/// flattening source alpha over the already-filled background.
fn draw_scaled(
    frame: &mut FrameRgba,
    snapshot: &RawSnapshot,
    layout: &FrameLayout,
    config: &CaptureConfig,
) {
    let sx_per_dx = f64::from(layout.visible_width) / f64::from(layout.scaled_width);
    let sy_per_dy = f64::from(layout.visible_height) / f64::from(layout.scaled_height);

    for dy in 0..layout.scaled_height {
        let src_y = f64::from(config.crop_top) + (f64::from(dy) + 0.5) * sy_per_dy - 0.5;
        let out_y = (layout.offset_y + dy) as usize;
        for dx in 0..layout.scaled_width {
            let src_x = f64::from(config.crop_left) + (f64::from(dx) + 0.5) * sx_per_dx - 0.5;
            let [r, g, b, a] = sample_bilinear(snapshot, src_x, src_y);

            let out = &mut frame.data[(out_y * frame.width as usize
                + (layout.offset_x + dx) as usize)
                * 4..][..4];
            let alpha = f64::from(a) / 255.0;
            out[0] = blend_over(r, config.background.r, alpha);
            out[1] = blend_over(g, config.background.g, alpha);
            out[2] = blend_over(b, config.background.b, alpha);
            out[3] = 255;
        }
    }
}

fn blend_over(src: f64, bg: u8, alpha: f64) -> u8 {
    (src * alpha + f64::from(bg) * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8
}

fn sample_bilinear(snapshot: &RawSnapshot, x: f64, y: f64) -> [f64; 4] {
    let max_x = (snapshot.width - 1) as f64;
    let max_y = (snapshot.height - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);
    let fx = x - x0;
    let fy = y - y0;

    let px = |px_x: f64, px_y: f64| -> [f64; 4] {
        let idx = (px_y as usize * snapshot.width as usize + px_x as usize) * 4;
        let p = &snapshot.data[idx..idx + 4];
        [
            f64::from(p[0]),
            f64::from(p[1]),
            f64::from(p[2]),
            f64::from(p[3]),
        ]
    };

    let p00 = px(x0, y0);
    let p10 = px(x1, y0);
    let p01 = px(x0, y1);
    let p11 = px(x1, y1);

    let mut out = [0.0; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = top * (1.0 - fy) + bottom * fy;
    }
    out
}
