use serde::Serialize;

/// A linear legend mapping a channel's value range onto color stops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
    pub stops: &'static [&'static str],
}

pub const NDVI_SCALE: ColorScale = ColorScale {
    min: -0.2,
    max: 1.0,
    unit: "",
    stops: &["#8B0000", "#FF0000", "#FFFF00", "#00FF00", "#006400"],
};

pub const LST_SCALE: ColorScale = ColorScale {
    min: 280.0,
    max: 320.0,
    unit: "K",
    stops: &["#000080", "#0000FF", "#00FFFF", "#FFFF00", "#FF0000"],
};

const WATER_QUALITY_STOPS: &[&str] = &[
    "#000080", "#0066CC", "#00CCFF", "#FFFF00", "#FF6600", "#CC0000",
];

pub const CHLOROPHYLL_SCALE: ColorScale = ColorScale {
    min: 0.0,
    max: 40.0,
    unit: "μg/L",
    stops: WATER_QUALITY_STOPS,
};

pub const WATER_TEMPERATURE_SCALE: ColorScale = ColorScale {
    min: 23.0,
    max: 29.0,
    unit: "°C",
    stops: WATER_QUALITY_STOPS,
};

/// Low oxygen is the bad end, so the stops run reversed.
pub const DISSOLVED_OXYGEN_SCALE: ColorScale = ColorScale {
    min: 4.0,
    max: 9.0,
    unit: "mg/L",
    stops: &[
        "#CC0000", "#FF6600", "#FFFF00", "#00CCFF", "#0066CC", "#000080",
    ],
};

impl ColorScale {
    /// Position of `value` on the scale, clamped to 0..=1.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let range = self.max - self.min;
        if range <= 0.0 {
            return Some(0.0);
        }
        Some(((value - self.min) / range).clamp(0.0, 1.0))
    }

    /// Color for `value`, interpolated in HSL between the neighbouring stops.
    /// Values outside the range take the end colors.
    pub fn color_at(&self, value: f64) -> Option<(u8, u8, u8)> {
        let t = self.normalize(value)?;
        let last = self.stops.len().checked_sub(1)?;
        if last == 0 || t >= 1.0 {
            return parse_hex_color(self.stops[last]);
        }

        let position = t * last as f64;
        let index = (position.floor() as usize).min(last - 1);
        let local = position - index as f64;

        let (r0, g0, b0) = parse_hex_color(self.stops[index])?;
        let (r1, g1, b1) = parse_hex_color(self.stops[index + 1])?;
        let (h, s, l) = interpolate_hsl(rgb_to_hsl(r0, g0, b0), rgb_to_hsl(r1, g1, b1), local);
        Some(hsl_to_rgb(h, s, l))
    }
}

/// Parse `#rrggbb` (the `#` is optional).
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Convert RGB to HSL. Returns (h: 0..360, s: 0..1, l: 0..1).
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        let mut h = (g - b) / d;
        if g < b {
            h += 6.0;
        }
        h
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Interpolate between two HSL colors using shortest hue path.
pub fn interpolate_hsl(from: (f64, f64, f64), to: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    let mut dh = to.0 - from.0;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    let h = (from.0 + dh * t).rem_euclid(360.0);
    let s = from.1 + (to.1 - from.1) * t;
    let l = from.2 + (to.2 - from.2) * t;

    (h, s, l)
}

#[cfg(test)]
mod tests {
    use super::{
        CHLOROPHYLL_SCALE, ColorScale, DISSOLVED_OXYGEN_SCALE, NDVI_SCALE, hsl_to_rgb,
        interpolate_hsl, parse_hex_color, rgb_to_hsl,
    };

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn roundtrip_rgb_through_hsl_is_identity() {
        let samples = [
            (0, 0, 0),
            (255, 255, 255),
            (128, 128, 128),
            (255, 0, 0),
            (0, 255, 0),
            (0, 0, 255),
            (37, 91, 201),
            (250, 180, 20),
        ];

        for (r, g, b) in samples {
            let (h, s, l) = rgb_to_hsl(r, g, b);
            assert_eq!(hsl_to_rgb(h, s, l), (r, g, b));
        }
    }

    #[test]
    fn rgb_to_hsl_gray_has_zero_saturation() {
        let (h, s, l) = rgb_to_hsl(128, 128, 128);
        assert_close(h, 0.0);
        assert_close(s, 0.0);
        assert_close(l, 128.0 / 255.0);
    }

    #[test]
    fn rgb_to_hsl_pure_primaries() {
        let (h_r, s_r, l_r) = rgb_to_hsl(255, 0, 0);
        assert_close(h_r, 0.0);
        assert_close(s_r, 1.0);
        assert_close(l_r, 0.5);

        let (h_g, s_g, l_g) = rgb_to_hsl(0, 255, 0);
        assert_close(h_g, 120.0);
        assert_close(s_g, 1.0);
        assert_close(l_g, 0.5);

        let (h_b, s_b, l_b) = rgb_to_hsl(0, 0, 255);
        assert_close(h_b, 240.0);
        assert_close(s_b, 1.0);
        assert_close(l_b, 0.5);
    }

    #[test]
    fn interpolate_hsl_wraps_shortest_path() {
        let from = (350.0, 0.6, 0.4);
        let to = (10.0, 0.8, 0.5);

        let mid = interpolate_hsl(from, to, 0.5);
        assert_close(mid.0, 0.0);
        assert_close(mid.1, 0.7);
        assert_close(mid.2, 0.45);
    }

    #[test]
    fn interpolate_hsl_at_t0_and_t1() {
        let from = (42.0, 0.1, 0.2);
        let to = (300.0, 0.9, 0.8);

        assert_eq!(interpolate_hsl(from, to, 0.0), from);
        assert_eq!(interpolate_hsl(from, to, 1.0), to);
    }

    #[test]
    fn scale_ends_match_first_and_last_stops() {
        assert_eq!(NDVI_SCALE.color_at(-0.2), Some((0x8B, 0x00, 0x00)));
        assert_eq!(NDVI_SCALE.color_at(1.0), Some((0x00, 0x64, 0x00)));
        assert_eq!(NDVI_SCALE.color_at(-5.0), NDVI_SCALE.color_at(-0.2));
        assert_eq!(NDVI_SCALE.color_at(7.0), NDVI_SCALE.color_at(1.0));
        assert_eq!(NDVI_SCALE.color_at(f64::NAN), None);
    }

    #[test]
    fn scale_hits_interior_stops_exactly() {
        // 0..40 over 5 segments puts a stop every 8 units.
        assert_eq!(CHLOROPHYLL_SCALE.color_at(8.0), parse_hex_color("#0066CC"));
        assert_eq!(CHLOROPHYLL_SCALE.color_at(24.0), parse_hex_color("#FFFF00"));
    }

    #[test]
    fn oxygen_scale_is_reversed() {
        assert_eq!(DISSOLVED_OXYGEN_SCALE.color_at(4.0), parse_hex_color("#CC0000"));
        assert_eq!(DISSOLVED_OXYGEN_SCALE.color_at(9.0), parse_hex_color("#000080"));
    }

    #[test]
    fn degenerate_scales() {
        let flat = ColorScale {
            min: 1.0,
            max: 1.0,
            unit: "",
            stops: &["#112233", "#445566"],
        };
        assert_eq!(flat.normalize(5.0), Some(0.0));
        assert_eq!(flat.color_at(5.0), Some((0x11, 0x22, 0x33)));

        let empty = ColorScale {
            stops: &[],
            ..flat
        };
        assert_eq!(empty.color_at(1.0), None);
    }

    #[test]
    fn parse_hex_color_accepts_optional_hash() {
        assert_eq!(parse_hex_color("#dc2626"), Some((0xdc, 0x26, 0x26)));
        assert_eq!(parse_hex_color("f59e0b"), Some((0xf5, 0x9e, 0x0b)));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }
}
