//! Pixel formats and color representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value that can be stored in a pixel buffer and blended.
///
/// `lerp_by` interpolates from `from` towards `to`, weighted by the coverage
/// (alpha) of `weight`. Every blend operator is expressed in terms of it.
pub trait Pixel: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Fully transparent value; also what fresh buffers are filled with.
    const CLEAR: Self;

    /// Whether this pixel has non-zero alpha.
    fn has_coverage(self) -> bool;

    /// Interpolate between `from` and `to` by the alpha of `weight`.
    fn lerp_by(from: Self, to: Self, weight: Self) -> Self;
}

/// Fixed-point lerp between two channel values with an 8-bit weight.
///
/// Exact at both ends: `u == 0` yields `a`, `u == 255` yields `b`.
#[inline]
pub fn lerp_u8(a: u8, b: u8, u: u8) -> u8 {
    let u = u as u32;
    ((a as u32 * (255 - u) + b as u32 * u + 127) / 255) as u8
}

/// Single-channel coverage pixels. The value doubles as its own alpha.
impl Pixel for u8 {
    const CLEAR: u8 = 0;

    #[inline]
    fn has_coverage(self) -> bool {
        self > 0
    }

    #[inline]
    fn lerp_by(from: u8, to: u8, weight: u8) -> u8 {
        lerp_u8(from, to, weight)
    }
}

/// RGBA color with 8-bit components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse color from hex string (e.g., "#ff0000", "#f00", "#ff000080").
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);

        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::rgb(r, g, b))
            }
            8 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
                Some(Self::rgba(r, g, b, a))
            }
            _ => None,
        }
    }

    /// Get a named palette color.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "transparent" | "clear" => Some(Self::TRANSPARENT),
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::RED),
            "green" => Some(Self::GREEN),
            "blue" => Some(Self::BLUE),
            "yellow" => Some(Self::rgb(255, 255, 0)),
            "cyan" => Some(Self::rgb(0, 255, 255)),
            "magenta" => Some(Self::rgb(255, 0, 255)),
            "gray" | "grey" => Some(Self::rgb(128, 128, 128)),
            "orange" => Some(Self::rgb(255, 165, 0)),
            "purple" => Some(Self::rgb(128, 0, 128)),
            _ => None,
        }
    }

    /// Parse either a hex string or a palette name.
    pub fn parse(value: &str) -> Option<Self> {
        Self::from_name(value).or_else(|| Self::from_hex(value))
    }

    #[inline]
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn from_array([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl Pixel for Color {
    const CLEAR: Color = Color::TRANSPARENT;

    #[inline]
    fn has_coverage(self) -> bool {
        self.a > 0
    }

    #[inline]
    fn lerp_by(from: Color, to: Color, weight: Color) -> Color {
        let u = weight.a;
        Color::rgba(
            lerp_u8(from.r, to.r, u),
            lerp_u8(from.g, to.g, u),
            lerp_u8(from.b, to.b, u),
            lerp_u8(from.a, to.a, u),
        )
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// RGBA color with normalized floating point components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorF32 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorF32 {
    pub const TRANSPARENT: ColorF32 = ColorF32::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Pixel for ColorF32 {
    const CLEAR: ColorF32 = ColorF32::TRANSPARENT;

    #[inline]
    fn has_coverage(self) -> bool {
        self.a > 0.0
    }

    #[inline]
    fn lerp_by(from: ColorF32, to: ColorF32, weight: ColorF32) -> ColorF32 {
        let u = weight.a.clamp(0.0, 1.0);
        // exact at both ends so an opaque source replaces outright
        let lerp = |a: f32, b: f32| a * (1.0 - u) + b * u;
        ColorF32::new(
            lerp(from.r, to.r),
            lerp(from.g, to.g),
            lerp(from.b, to.b),
            lerp(from.a, to.a),
        )
    }
}

impl From<Color> for ColorF32 {
    fn from(c: Color) -> Self {
        ColorF32::new(
            c.r as f32 / 255.0,
            c.g as f32 / 255.0,
            c.b as f32 / 255.0,
            c.a as f32 / 255.0,
        )
    }
}

impl From<ColorF32> for Color {
    fn from(c: ColorF32) -> Self {
        let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::rgba(quantize(c.r), quantize(c.g), quantize(c.b), quantize(c.a))
    }
}
