//! Color conversions for the brightness/color controls.
//!
//! Covers Kelvin color temperature, the hue/saturation color wheel and the
//! RGB values sent to lights. All functions are total: out-of-range or NaN
//! intermediate values clamp into [0, 255].

use kurbo::Point;
use peniko::Color;
use serde::{Deserialize, Serialize};

/// Warmest temperature the Kelvin approximation is tuned for.
pub const MIN_KELVIN: u32 = 1000;
/// Coolest temperature the Kelvin approximation is tuned for.
pub const MAX_KELVIN: u32 = 10000;

/// An 8-bit sRGB color. Serializes as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as a `[r, g, b]` array, the shape lights expect for `rgb_color`.
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(color: Rgb) -> Self {
        color.to_array()
    }
}

impl From<Rgb> for Color {
    fn from(color: Rgb) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, 255)
    }
}

fn channel(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.clamp(0.0, 255.0).round() as u8
    }
}

/// Approximate the RGB color of a black body at `kelvin`.
///
/// Piecewise fit valid for roughly 1000K-10000K. Below 6600K red is
/// saturated and green/blue follow logarithmic curves; above it red and
/// green fall off along power curves while blue is saturated.
pub fn kelvin_to_rgb(kelvin: f64) -> Rgb {
    let temp = kelvin / 100.0;

    let (r, g, b) = if temp <= 66.0 {
        let g = 99.470_802_586_1 * temp.ln() - 161.119_568_166_1;
        let b = if temp <= 19.0 {
            0.0
        } else {
            138.517_731_223_1 * (temp - 10.0).ln() - 305.044_792_730_7
        };
        (255.0, g, b)
    } else {
        let r = 329.698_727_446 * (temp - 60.0).powf(-0.133_204_759_2);
        let g = 288.122_169_528_3 * (temp - 60.0).powf(-0.075_514_849_2);
        (r, g, 255.0)
    };

    Rgb::new(channel(r), channel(g), channel(b))
}

/// Convert Kelvin to mireds. Non-positive input yields 0.
pub fn kelvin_to_mireds(kelvin: u32) -> u32 {
    if kelvin == 0 {
        return 0;
    }
    (1_000_000.0 / kelvin as f64).round() as u32
}

/// Convert mireds to Kelvin. Non-positive input yields 0.
pub fn mireds_to_kelvin(mireds: u32) -> u32 {
    if mireds == 0 {
        return 0;
    }
    (1_000_000.0 / mireds as f64).round() as u32
}

/// Convert HSL to RGB. `hue` in degrees, `saturation` and `lightness` in [0, 1].
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let h = hue.rem_euclid(360.0);
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgb::new(
        channel((r + m) * 255.0),
        channel((g + m) * 255.0),
        channel((b + m) * 255.0),
    )
}

/// Convert RGB to `(hue_degrees, saturation, lightness)`.
pub fn rgb_to_hsl(color: Rgb) -> (f64, f64, f64) {
    let r = color.r as f64 / 255.0;
    let g = color.g as f64 / 255.0;
    let b = color.b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;

    if d == 0.0 {
        return (0.0, 0.0, l);
    }

    let s = d / (1.0 - (2.0 * l - 1.0).abs());
    let h = if max == r {
        60.0 * ((g - b) / d).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / d + 2.0)
    } else {
        60.0 * ((r - g) / d + 4.0)
    };

    (h, s.clamp(0.0, 1.0), l)
}

/// Lightness used by the wheel at a given saturation: near-white at the
/// centre, fully colored at the rim.
fn wheel_lightness(saturation: f64) -> f64 {
    0.45 + (1.0 - saturation) * 0.35
}

/// Color of the wheel at `angle_degrees` and `radius_fraction` (0 centre, 1 rim).
pub fn wheel_sample(angle_degrees: f64, radius_fraction: f64) -> Rgb {
    let saturation = if radius_fraction.is_nan() { 0.0 } else { radius_fraction.clamp(0.0, 1.0) };
    hsl_to_rgb(angle_degrees, saturation, wheel_lightness(saturation))
}

/// Wheel coordinates `(angle_degrees, radius_fraction)` where `color` appears.
pub fn wheel_coordinates(color: Rgb) -> (f64, f64) {
    let (h, s, _) = rgb_to_hsl(color);
    (h, s)
}

/// A procedurally rendered square color wheel image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorWheel {
    /// Side length in pixels.
    pub size: u32,
}

impl ColorWheel {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    fn radius(&self) -> f64 {
        self.size as f64 / 2.0
    }

    /// Sample the pixel at `(px, py)`. Returns `None` outside the disc.
    pub fn sample(&self, px: f64, py: f64) -> Option<Rgb> {
        let radius = self.radius();
        if radius <= 0.0 {
            return None;
        }
        let dx = px - radius;
        let dy = py - radius;
        let distance = (dx * dx + dy * dy).sqrt() / radius;
        if distance > 1.0 || distance.is_nan() {
            return None;
        }
        let angle = dy.atan2(dx).to_degrees().rem_euclid(360.0);
        Some(wheel_sample(angle, distance))
    }

    /// Pixel location of the marker for `color`.
    pub fn point_for(&self, color: Rgb) -> Point {
        let (angle, fraction) = wheel_coordinates(color);
        let radius = self.radius();
        let theta = angle.to_radians();
        Point::new(
            radius + theta.cos() * fraction * radius,
            radius + theta.sin() * fraction * radius,
        )
    }

    /// Render the wheel as a row-major RGBA buffer; pixels outside the disc are transparent.
    pub fn render_rgba(&self) -> Vec<u8> {
        let size = self.size as usize;
        let mut pixels = Vec::with_capacity(size * size * 4);
        for y in 0..size {
            for x in 0..size {
                match self.sample(x as f64 + 0.5, y as f64 + 0.5) {
                    Some(color) => pixels.extend_from_slice(&[color.r, color.g, color.b, 255]),
                    None => pixels.extend_from_slice(&[0, 0, 0, 0]),
                }
            }
        }
        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_peniko_color() {
        let rgba = Color::from(Rgb::new(12, 200, 77)).to_rgba8();
        assert_eq!((rgba.r, rgba.g, rgba.b, rgba.a), (12, 200, 77, 255));
    }

    #[test]
    fn test_kelvin_bounds() {
        for kelvin in [1000.0, 2700.0, 4000.0, 6500.0, 10000.0] {
            let rgb = kelvin_to_rgb(kelvin);
            // u8 guarantees the range; check the warm end is actually warm.
            if kelvin < 6000.0 {
                assert_eq!(rgb.r, 255);
                assert!(rgb.b < rgb.r);
            }
        }
        let cool = kelvin_to_rgb(10000.0);
        assert_eq!(cool.b, 255);
        assert!(cool.r < 255);
    }

    #[test]
    fn test_kelvin_neutral_white() {
        let rgb = kelvin_to_rgb(6600.0);
        assert_eq!(rgb.r, 255);
        assert!(rgb.g >= 250);
        assert!(rgb.b >= 245);
    }

    #[test]
    fn test_kelvin_warm_has_no_blue() {
        assert_eq!(kelvin_to_rgb(1500.0).b, 0);
    }

    #[test]
    fn test_kelvin_degenerate_input() {
        let zero = kelvin_to_rgb(0.0);
        assert_eq!(zero, Rgb::new(255, 0, 0));
        let nan = kelvin_to_rgb(f64::NAN);
        assert_eq!(nan, Rgb::new(0, 0, 255));
    }

    #[test]
    fn test_mireds() {
        assert_eq!(kelvin_to_mireds(2000), 500);
        assert_eq!(mireds_to_kelvin(250), 4000);
        assert_eq!(kelvin_to_mireds(0), 0);
        assert_eq!(mireds_to_kelvin(0), 0);
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), Rgb::new(0, 0, 255));
        assert_eq!(hsl_to_rgb(360.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(hsl_to_rgb(42.0, 0.0, 1.0), Rgb::WHITE);
    }

    #[test]
    fn test_wheel_centre_near_white() {
        let centre = wheel_sample(0.0, 0.0);
        assert_eq!(centre.r, centre.g);
        assert_eq!(centre.g, centre.b);
        assert!(centre.r > 200);
    }

    #[test]
    fn test_wheel_rim_saturated() {
        let rim = wheel_sample(120.0, 1.0);
        assert_eq!(rim.r, 0);
        assert_eq!(rim.b, 0);
        assert!(rim.g > 200);
    }

    #[test]
    fn test_wheel_coordinates_inverse() {
        let (angle, radius) = wheel_coordinates(wheel_sample(200.0, 0.8));
        assert!((angle - 200.0).abs() < 2.0);
        assert!((radius - 0.8).abs() < 0.03);
    }

    #[test]
    fn test_color_wheel_sample() {
        let wheel = ColorWheel::new(200);
        assert!(wheel.sample(0.0, 0.0).is_none());
        // Right edge of the disc is hue 0 at full saturation.
        let rim = wheel.sample(199.0, 100.0).unwrap();
        assert!(rim.r > rim.g && rim.r > rim.b);
        let centre = wheel.sample(100.0, 100.0).unwrap();
        assert_eq!(centre, wheel_sample(0.0, 0.0));
    }

    #[test]
    fn test_color_wheel_point_for_rim_color() {
        let wheel = ColorWheel::new(200);
        let p = wheel.point_for(wheel_sample(0.0, 1.0));
        assert!((p.x - 200.0).abs() < 2.0);
        assert!((p.y - 100.0).abs() < 2.0);
    }

    #[test]
    fn test_rgb_serializes_as_array() {
        assert_eq!(serde_json::to_string(&Rgb::new(1, 2, 3)).unwrap(), "[1,2,3]");
        let parsed: Rgb = serde_json::from_str("[255,128,0]").unwrap();
        assert_eq!(parsed, Rgb::new(255, 128, 0));
    }

    #[test]
    fn test_render_rgba_size() {
        let wheel = ColorWheel::new(16);
        let pixels = wheel.render_rgba();
        assert_eq!(pixels.len(), 16 * 16 * 4);
        // Corner pixel is outside the disc.
        assert_eq!(&pixels[0..4], &[0, 0, 0, 0]);
    }
}
