use crate::error::{ScenecapError, ScenecapResult};

/// Opaque background color. Stored as straight RGB; output frames are always
/// fully opaque, so there is no alpha channel here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(s: &str) -> ScenecapResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ScenecapError::validation(format!(
                "background color '{s}' is not a #rrggbb hex color"
            )));
        }
        let parse = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).expect("checked hex digits");
        Ok(Self {
            r: parse(0),
            g: parse(2),
            b: parse(4),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    None,
    Grayscale,
    Sepia,
    Invert,
    Vhs,
}

impl ColorScheme {
    /// The profile blend factors the scheme forces on. `Vhs` makes its
    /// adjustments inside the color pipeline instead.
    pub fn forced_filters(self, filters: FilterValues) -> FilterValues {
        FilterValues {
            grayscale: if self == Self::Grayscale { 100.0 } else { filters.grayscale },
            sepia: if self == Self::Sepia { 100.0 } else { filters.sepia },
            invert: if self == Self::Invert { 100.0 } else { filters.invert },
            ..filters
        }
    }
}

/// Per-channel filter parameters in CSS-filter percentage units.
/// 100/100/100 and 0/0/0 leaves pixels untouched.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterValues {
    pub brightness: f64,
    pub contrast: f64,
    pub saturate: f64,
    pub grayscale: f64,
    pub sepia: f64,
    pub invert: f64,
}

impl Default for FilterValues {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturate: 100.0,
            grayscale: 0.0,
            sepia: 0.0,
            invert: 0.0,
        }
    }
}

impl FilterValues {
    pub fn validate(&self) -> ScenecapResult<()> {
        for (name, v) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturate", self.saturate),
            ("grayscale", self.grayscale),
            ("sepia", self.sepia),
            ("invert", self.invert),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ScenecapError::validation(format!(
                    "filter '{name}' must be finite and >= 0 (got {v})"
                )));
            }
        }
        Ok(())
    }
}

/// Immutable capture parameters for one session.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub duration_seconds: f64,
    pub fps: u32,
    pub loop_count: u32,
    pub playback_speed: f64,
    pub target_width: u32,
    pub target_height: u32,
    pub crop_top: u32,
    pub crop_bottom: u32,
    pub crop_left: u32,
    pub crop_right: u32,
    pub background: Rgb,
    pub color_scheme: ColorScheme,
    pub filters: FilterValues,
    pub bitrate_mbps: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 3.0,
            fps: 30,
            loop_count: 1,
            playback_speed: 1.0,
            target_width: 640,
            target_height: 480,
            crop_top: 0,
            crop_bottom: 0,
            crop_left: 0,
            crop_right: 0,
            background: Rgb::BLACK,
            color_scheme: ColorScheme::None,
            filters: FilterValues::default(),
            bitrate_mbps: 2.0,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> ScenecapResult<()> {
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(ScenecapError::validation(
                "duration_seconds must be finite and >= 0",
            ));
        }
        if self.fps == 0 {
            return Err(ScenecapError::validation("fps must be > 0"));
        }
        if self.loop_count == 0 {
            return Err(ScenecapError::validation("loop_count must be >= 1"));
        }
        if !self.playback_speed.is_finite() || self.playback_speed <= 0.0 {
            return Err(ScenecapError::validation("playback_speed must be > 0"));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(ScenecapError::validation(
                "target width/height must be non-zero",
            ));
        }
        if self.target_width % 2 != 0 || self.target_height % 2 != 0 {
            // yuv420p output requires even dimensions.
            return Err(ScenecapError::validation(
                "target width/height must be even",
            ));
        }
        if !self.bitrate_mbps.is_finite() || self.bitrate_mbps <= 0.0 {
            return Err(ScenecapError::validation("bitrate_mbps must be > 0"));
        }
        self.filters.validate()
    }

    /// Bitrate handed to the encoder, in bits per second. The VHS profile
    /// records at 1.5x to survive the overlay's high-frequency detail.
    pub fn effective_bitrate_bps(&self) -> u64 {
        let mbps = if self.color_scheme == ColorScheme::Vhs {
            self.bitrate_mbps * 1.5
        } else {
            self.bitrate_mbps
        };
        (mbps * 1_000_000.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        CaptureConfig::default().validate().unwrap();
    }

    #[test]
    fn odd_target_dimensions_are_rejected() {
        let cfg = CaptureConfig {
            target_width: 501,
            ..CaptureConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_duration_is_allowed() {
        let cfg = CaptureConfig {
            duration_seconds: 0.0,
            ..CaptureConfig::default()
        };
        cfg.validate().unwrap();
    }

    #[test]
    fn bad_speed_and_loops_are_rejected() {
        assert!(
            CaptureConfig {
                playback_speed: 0.0,
                ..CaptureConfig::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            CaptureConfig {
                loop_count: 0,
                ..CaptureConfig::default()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn hex_color_parses() {
        assert_eq!(Rgb::from_hex("#1a113c").unwrap(), Rgb::new(0x1a, 0x11, 0x3c));
        assert_eq!(Rgb::from_hex("ffffff").unwrap(), Rgb::new(255, 255, 255));
        assert!(Rgb::from_hex("#fff").is_err());
        assert!(Rgb::from_hex("not-a-color").is_err());
    }

    #[test]
    fn vhs_raises_bitrate() {
        let cfg = CaptureConfig {
            bitrate_mbps: 2.0,
            color_scheme: ColorScheme::Vhs,
            ..CaptureConfig::default()
        };
        assert_eq!(cfg.effective_bitrate_bps(), 3_000_000);
    }

    #[test]
    fn scheme_forces_blend_factors() {
        let f = FilterValues::default();
        assert_eq!(ColorScheme::Grayscale.forced_filters(f).grayscale, 100.0);
        assert_eq!(ColorScheme::Sepia.forced_filters(f).sepia, 100.0);
        assert_eq!(ColorScheme::Invert.forced_filters(f).invert, 100.0);
        assert_eq!(ColorScheme::None.forced_filters(f), f);
    }

    #[test]
    fn config_json_roundtrip() {
        let cfg = CaptureConfig {
            color_scheme: ColorScheme::Vhs,
            crop_left: 50,
            ..CaptureConfig::default()
        };
        let s = serde_json::to_string_pretty(&cfg).unwrap();
        let de: CaptureConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(de.color_scheme, ColorScheme::Vhs);
        assert_eq!(de.crop_left, 50);
    }
}
