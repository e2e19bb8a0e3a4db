//! Color parsing, palettes and serde helpers.

use bevy_color::{Mix, Srgba};
use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Categorical palette (d3 category10) used for community colors.
const PALETTE: [[u8; 3]; 10] = [
    [0x1f, 0x77, 0xb4],
    [0xff, 0x7f, 0x0e],
    [0x2c, 0xa0, 0x2c],
    [0xd6, 0x27, 0x28],
    [0x94, 0x67, 0xbd],
    [0x8c, 0x56, 0x4b],
    [0xe3, 0x77, 0xc2],
    [0x7f, 0x7f, 0x7f],
    [0xbc, 0xbd, 0x22],
    [0x17, 0xbe, 0xcf],
];

pub const GRAY: Srgba = Srgba::new(0.5, 0.5, 0.5, 1.0);

/// Palette color for a category index.
pub fn palette_color(index: usize) -> Srgba {
    let [r, g, b] = PALETTE[index % PALETTE.len()];
    Srgba::rgb_u8(r, g, b)
}

/// Parses `#rgb`, `#rrggbb`, `#rrggbbaa` or a basic color name.
pub fn parse_color(value: &str) -> Result<Srgba, AppError> {
    let trimmed = value.trim();
    let named = match trimmed.to_ascii_lowercase().as_str() {
        "white" => Some(Srgba::WHITE),
        "black" => Some(Srgba::BLACK),
        "red" => Some(Srgba::rgb(1.0, 0.0, 0.0)),
        "green" => Some(Srgba::rgb(0.0, 1.0, 0.0)),
        "blue" => Some(Srgba::rgb(0.0, 0.0, 1.0)),
        "yellow" => Some(Srgba::rgb(1.0, 0.92, 0.016)),
        "cyan" => Some(Srgba::rgb(0.0, 1.0, 1.0)),
        "magenta" => Some(Srgba::rgb(1.0, 0.0, 1.0)),
        "gray" | "grey" => Some(GRAY),
        "clear" => Some(Srgba::NONE),
        _ => None,
    };
    if let Some(color) = named {
        return Ok(color);
    }
    if !trimmed.starts_with('#') {
        return Err(AppError::InvalidColor(value.to_string()));
    }
    Srgba::hex(trimmed).map_err(|_| AppError::InvalidColor(value.to_string()))
}

/// Parses a color, falling back to white for unreadable strings.
pub fn parse_color_or_white(value: &str) -> Srgba {
    parse_color(value).unwrap_or(Srgba::WHITE)
}

/// Blend from white toward `color`.
pub fn tint(color: Srgba, t: f32) -> Srgba {
    Srgba::WHITE.mix(&color, t.clamp(0.0, 1.0))
}

/// `#rrggbbaa` form used in dumps.
pub fn to_hex(color: Srgba) -> String {
    color.to_hex()
}

/// Serde adapter for color strings.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Srgba, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_color(&value).map_err(serde::de::Error::custom)
}
