//! Symbol styles for preview graphics and committed artifacts.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// `#rrggbb` form, used in log output.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    Bevel,
    Miter,
    #[default]
    Round,
}

/// Simple line symbol used for the live drawing preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    pub color: SerializableColor,
    /// Width in points.
    pub width: f64,
    pub cap: LineCap,
    pub join: LineJoin,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: Color::from_rgba8(4, 90, 141, 255).into(),
            width: 4.0,
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }
}

/// Outline drawn along the edges of an extruded volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub color: SerializableColor,
    pub size: f64,
}

/// 3D extrusion symbol applied to a committed building footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrusionStyle {
    pub material: SerializableColor,
    /// Solid edge outline, or `None` for no edges.
    pub edges: Option<EdgeStyle>,
    /// Extrusion height in meters.
    pub height: f64,
}

impl Default for ExtrusionStyle {
    fn default() -> Self {
        Self {
            material: Color::from_rgba8(0xA7, 0xC6, 0x36, 255).into(),
            edges: Some(EdgeStyle {
                color: Color::from_rgba8(0x4D, 0x5B, 0x18, 255).into(),
                size: 1.5,
            }),
            height: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_symbols() {
        let line = LineStyle::default();
        assert_eq!(line.color, SerializableColor::rgb(4, 90, 141));
        assert_eq!(line.width, 4.0);
        assert_eq!(line.cap, LineCap::Round);
        assert_eq!(line.join, LineJoin::Round);

        let extrusion = ExtrusionStyle::default();
        assert_eq!(extrusion.material.to_hex(), "#a7c636");
        let edges = extrusion.edges.unwrap();
        assert_eq!(edges.color.to_hex(), "#4d5b18");
        assert_eq!(edges.size, 1.5);
        assert_eq!(extrusion.height, 50.0);
    }

    #[test]
    fn test_color_conversion() {
        let color = SerializableColor::new(10, 20, 30, 40);
        let peniko: Color = color.into();
        assert_eq!(SerializableColor::from(peniko), color);
    }

    #[test]
    fn test_partial_style_uses_defaults() {
        let style: LineStyle = serde_json::from_str(r#"{ "width": 2.5, "cap": "square" }"#).unwrap();
        assert_eq!(style.width, 2.5);
        assert_eq!(style.cap, LineCap::Square);
        assert_eq!(style.join, LineJoin::Round);
        assert_eq!(style.color, LineStyle::default().color);
    }
}
