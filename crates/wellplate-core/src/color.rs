//! Color samples and RGB/HSV conversions.
//!
//! 8-bit HSV uses the OpenCV layout: `H` in `[0, 180)`, `S` and `V` in
//! `[0, 255]`. Normalized HSV divides each channel by its range so all three
//! lie in `[0, 1]`.

use serde::{Deserialize, Serialize};

/// 8-bit RGB triple. Serializes as `[r, g, b]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Channels in blue, green, red order.
    pub fn bgr(&self) -> [u8; 3] {
        [self.0[2], self.0[1], self.0[0]]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(v: [u8; 3]) -> Self {
        Self(v)
    }
}

/// HSV triple with every channel normalized to `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

/// Hue range of the 8-bit HSV encoding.
pub const HUE_RANGE_U8: f64 = 180.0;

/// RGB to 8-bit HSV, OpenCV rounding.
pub fn rgb_to_hsv_u8(c: Rgb) -> [u8; 3] {
    let r = c.r() as f64;
    let g = c.g() as f64;
    let b = c.b() as f64;

    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h8 = (h / 2.0).round() as u32 % HUE_RANGE_U8 as u32;
    [h8 as u8, s.round() as u8, v as u8]
}

impl Hsv {
    /// Normalize an 8-bit HSV triple.
    pub fn from_u8(hsv: [u8; 3]) -> Self {
        Self {
            h: hsv[0] as f64 / HUE_RANGE_U8,
            s: hsv[1] as f64 / 255.0,
            v: hsv[2] as f64 / 255.0,
        }
    }

    /// Convert back to RGB with the hexcone model.
    pub fn to_rgb(&self) -> Rgb {
        let [r, g, b] = hsv_to_rgb_unit(self.h, self.s, self.v);
        let q = |x: f64| (x * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgb::new(q(r), q(g), q(b))
    }
}

/// HSV in `[0, 1]` to RGB in `[0, 1]`.
pub fn hsv_to_rgb_unit(h: f64, s: f64, v: f64) -> [f64; 3] {
    if s == 0.0 {
        return [v, v, v];
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}
