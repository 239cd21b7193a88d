use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColorError {
    #[error("Empty color string")]
    Empty,

    #[error("Invalid hex color '{0}'")]
    InvalidHex(String),

    #[error("Invalid functional color '{0}'")]
    InvalidFunctional(String),

    #[error("Unknown color '{0}'")]
    Unknown(String),
}

/// Normalized RGBA color; every channel is in `0.0..=1.0`.
///
/// Serialized as its CSS-like string form so config files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build from 8-bit channels and a normalized alpha.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Build from a packed `0xRRGGBB` value. Alpha is opaque.
    pub fn from_rgb_u32(packed: u32) -> Self {
        Self::from_rgba8(
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            (packed & 0xFF) as u8,
            1.0,
        )
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            channel_to_u8(self.r),
            channel_to_u8(self.g),
            channel_to_u8(self.b),
            channel_to_u8(self.a),
        ]
    }

    pub fn to_f32_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

fn channel_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, _] = self.to_rgba8();
        write!(f, "rgba({}, {}, {}, {})", r, g, b, self.a)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ColorError::Empty);
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| ColorError::InvalidHex(s.to_string()));
        }
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("rgb") {
            return parse_functional(&lower)
                .ok_or_else(|| ColorError::InvalidFunctional(s.to_string()));
        }
        if let Some(hex) = lower.strip_prefix("0x") {
            return u32::from_str_radix(hex, 16)
                .map(Color::from_rgb_u32)
                .map_err(|_| ColorError::InvalidHex(s.to_string()));
        }
        match lower.as_str() {
            "black" => Ok(Color::BLACK),
            "white" => Ok(Color::WHITE),
            "transparent" => Ok(Color::TRANSPARENT),
            "red" => Ok(Color::from_rgb_u32(0xFF0000)),
            "green" => Ok(Color::from_rgb_u32(0x008000)),
            "blue" => Ok(Color::from_rgb_u32(0x0000FF)),
            "gray" | "grey" => Ok(Color::from_rgb_u32(0x808080)),
            _ => Err(ColorError::Unknown(s.to_string())),
        }
    }
}

/// `rgb`, `rgba`, `rrggbb` and `rrggbbaa` digit forms.
fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Color::from_rgba8(digit(0)?, digit(1)?, digit(2)?, 1.0)),
        4 => Some(Color::from_rgba8(
            digit(0)?,
            digit(1)?,
            digit(2)?,
            digit(3)? as f32 / 255.0,
        )),
        6 => Some(Color::from_rgba8(pair(0)?, pair(2)?, pair(4)?, 1.0)),
        8 => Some(Color::from_rgba8(
            pair(0)?,
            pair(2)?,
            pair(4)?,
            pair(6)? as f32 / 255.0,
        )),
        _ => None,
    }
}

fn parse_functional(s: &str) -> Option<Color> {
    let open = s.find('(')?;
    let body = s[open + 1..].strip_suffix(')')?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let channel = |p: &str| p.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
    match (&s[..open], parts.as_slice()) {
        ("rgb", [r, g, b]) => Some(Color::from_rgba8(
            channel(*r)?,
            channel(*g)?,
            channel(*b)?,
            1.0,
        )),
        ("rgba", [r, g, b, a]) => Some(Color::from_rgba8(
            channel(*r)?,
            channel(*g)?,
            channel(*b)?,
            a.parse::<f32>().ok()?,
        )),
        _ => None,
    }
}
