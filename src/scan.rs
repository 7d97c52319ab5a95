use std::sync::OnceLock;

use regex::Regex;

use crate::surface::Dimensions;

fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Longest declared animation duration in the document text, in seconds.
/// Looks at both explicit `animation-duration` properties and the first
/// duration inside `animation` shorthands; returns `None` when the
/// document declares no timed motion.
pub fn extract_animation_duration(code: &str) -> Option<f64> {
    static EXPLICIT: OnceLock<Regex> = OnceLock::new();
    static SHORTHAND: OnceLock<Regex> = OnceLock::new();

    let mut durations: Vec<f64> = Vec::new();

    let explicit = re(
        &EXPLICIT,
        r"animation(?:-duration)?\s*:\s*[^;}]*?([0-9.]+)(s|ms)",
    );
    for cap in explicit.captures_iter(code) {
        if let Some(v) = parse_seconds(&cap[1], &cap[2]) {
            durations.push(v);
        }
    }

    let shorthand = re(&SHORTHAND, r"animation\s*:\s*[^0-9]*([0-9.]+)(s|ms)");
    for cap in shorthand.captures_iter(code) {
        if let Some(v) = parse_seconds(&cap[1], &cap[2]) {
            durations.push(v);
        }
    }

    durations
        .into_iter()
        .max_by(|a, b| a.total_cmp(b))
}

fn parse_seconds(value: &str, unit: &str) -> Option<f64> {
    let v: f64 = value.parse().ok()?;
    Some(if unit == "ms" { v / 1000.0 } else { v })
}

/// Scene dimensions declared in the document, tried in order: the `.scene`
/// CSS block, plain JS `width`/`height` bindings, an explicit renderer
/// `setSize(w, h)`, then `<canvas width height>` attributes.
pub fn extract_dimensions(code: &str) -> Option<Dimensions> {
    static SCENE: OnceLock<Regex> = OnceLock::new();
    static JS_WIDTH: OnceLock<Regex> = OnceLock::new();
    static JS_HEIGHT: OnceLock<Regex> = OnceLock::new();
    static SET_SIZE: OnceLock<Regex> = OnceLock::new();
    static CANVAS: OnceLock<Regex> = OnceLock::new();

    let scene = re(
        &SCENE,
        r"(?s)\.scene\s*\{[^}]*?width:\s*(\d+)px;[^}]*?height:\s*(\d+)px;",
    );
    if let Some(cap) = scene.captures(code) {
        return dims(&cap[1], &cap[2]);
    }

    let jw = re(&JS_WIDTH, r"(?:let|const|var)\s+width\s*=\s*(\d+)");
    let jh = re(&JS_HEIGHT, r"(?:let|const|var)\s+height\s*=\s*(\d+)");
    if let (Some(w), Some(h)) = (jw.captures(code), jh.captures(code)) {
        return dims(&w[1], &h[1]);
    }

    let set_size = re(&SET_SIZE, r"setSize\(\s*(\d+)\s*,\s*(\d+)\s*\)");
    if let Some(cap) = set_size.captures(code) {
        return dims(&cap[1], &cap[2]);
    }

    let canvas = re(
        &CANVAS,
        r#"(?i)<canvas[^>]*?width\s*=\s*"(\d+)"[^>]*?height\s*=\s*"(\d+)""#,
    );
    if let Some(cap) = canvas.captures(code) {
        return dims(&cap[1], &cap[2]);
    }

    None
}

fn dims(w: &str, h: &str) -> Option<Dimensions> {
    Some(Dimensions {
        width: w.parse().ok()?,
        height: h.parse().ok()?,
    })
}
