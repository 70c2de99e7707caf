//! Presentation attributes carried alongside the reconstructed text.

use crate::ScribeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color with f32 components (0.0 to 1.0)
///
/// Serialized as a `#RRGGBB` / `#RRGGBBAA` hex string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create from u8 components (0-255)
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Create from hex value (0xRRGGBB or 0xRRGGBBAA)
    pub fn from_hex(hex: u32) -> Self {
        if hex > 0xFFFFFF {
            Self::from_rgba8(
                ((hex >> 24) & 0xFF) as u8,
                ((hex >> 16) & 0xFF) as u8,
                ((hex >> 8) & 0xFF) as u8,
                (hex & 0xFF) as u8,
            )
        } else {
            Self::from_rgba8(
                ((hex >> 16) & 0xFF) as u8,
                ((hex >> 8) & 0xFF) as u8,
                (hex & 0xFF) as u8,
                255,
            )
        }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`. The leading `#` is optional.
    pub fn parse(s: &str) -> Result<Self, ScribeError> {
        let digits = s.trim().trim_start_matches('#');
        let invalid = || ScribeError::InvalidColor(s.to_string());
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match digits.len() {
            3 => {
                let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
                let expand = |nibble: u32| ((nibble & 0xF) * 0x11) as u8;
                Ok(Self::from_rgba8(
                    expand(value >> 8),
                    expand(value >> 4),
                    expand(value),
                    255,
                ))
            }
            6 => Ok(Self::from_hex(
                u32::from_str_radix(digits, 16).map_err(|_| invalid())?,
            )),
            8 => {
                let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
                Ok(Self::from_rgba8(
                    (value >> 24) as u8,
                    (value >> 16) as u8,
                    (value >> 8) as u8,
                    value as u8,
                ))
            }
            _ => Err(invalid()),
        }
    }

    /// Convert to u8 array [r, g, b, a]
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            write!(f, "#{r:02X}{g:02X}{b:02X}")
        } else {
            write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ScribeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Default text color of the dark theme.
pub const DEFAULT_TEXT_COLOR: u32 = 0xE6E6E6;

/// Default text size in points.
pub const DEFAULT_SIZE_PT: f32 = 18.0;

/// The full set of presentation attributes at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: Color,
    pub size_pt: f32,
    /// Named gradient applied over the text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<String>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: Color::from_hex(DEFAULT_TEXT_COLOR),
            size_pt: DEFAULT_SIZE_PT,
            gradient: None,
        }
    }
}

impl Style {
    /// Overwrite only the fields the patch supplies.
    ///
    /// An empty gradient id clears the gradient; that is how a solid color is
    /// picked after a gradient was active.
    pub fn apply(&mut self, patch: &StylePatch) {
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(size) = patch.size_pt {
            if size.is_finite() && size > 0.0 {
                self.size_pt = size;
            } else {
                tracing::trace!(size, "ignoring non-positive text size");
            }
        }
        if let Some(gradient) = &patch.gradient {
            self.gradient = if gradient.is_empty() {
                None
            } else {
                Some(gradient.clone())
            };
        }
    }
}

/// A partial style update; `None` fields keep their previous value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_pt: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<String>,
}

impl StylePatch {
    pub fn color(color: Color) -> Self {
        Self {
            color: Some(color),
            ..Default::default()
        }
    }

    pub fn size(size_pt: f32) -> Self {
        Self {
            size_pt: Some(size_pt),
            ..Default::default()
        }
    }

    pub fn gradient(id: impl Into<String>) -> Self {
        Self {
            gradient: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.size_pt.is_none() && self.gradient.is_none()
    }
}
