//! Color parsing for scene fills and strokes.

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

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Scale the alpha channel by `opacity` (0.0..=1.0).
    pub fn with_opacity(self, opacity: f64) -> Self {
        let color: Color = self.into();
        let rgba = color.to_rgba8();
        let alpha = (rgba.a as f64 * opacity.clamp(0.0, 1.0)) as u8;
        Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha).into()
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
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

/// Parse a CSS-style color string.
///
/// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)`, `rgba(r,g,b,a)` and a
/// handful of keywords. Returns `None` for anything else, including `none`.
pub fn parse_color(value: &str) -> Option<SerializableColor> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }

    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let channel = |s: &str| s.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
        let r = channel(parts[0])?;
        let g = channel(parts[1])?;
        let b = channel(parts[2])?;
        let a = match parts.get(3) {
            Some(a) => (a.parse::<f64>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
            None => 255,
        };
        return Some(SerializableColor::new(r, g, b, a));
    }

    match lower.as_str() {
        "black" => Some(SerializableColor::black()),
        "white" => Some(SerializableColor::white()),
        "transparent" => Some(SerializableColor::transparent()),
        "red" => Some(SerializableColor::new(255, 0, 0, 255)),
        "green" => Some(SerializableColor::new(0, 128, 0, 255)),
        "blue" => Some(SerializableColor::new(0, 0, 255, 255)),
        "gray" | "grey" => Some(SerializableColor::new(128, 128, 128, 255)),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<SerializableColor> {
    if !hex.is_ascii() {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let r = byte(&hex[0..1])? * 17;
            let g = byte(&hex[1..2])? * 17;
            let b = byte(&hex[2..3])? * 17;
            Some(SerializableColor::new(r, g, b, 255))
        }
        6 => Some(SerializableColor::new(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            255,
        )),
        8 => Some(SerializableColor::new(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_color("#fff"), Some(SerializableColor::white()));
        assert_eq!(parse_color("#ff0000"), Some(SerializableColor::new(255, 0, 0, 255)));
        assert_eq!(parse_color("#00ff0080"), Some(SerializableColor::new(0, 255, 0, 128)));
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_color("rgb(10, 20, 30)"), Some(SerializableColor::new(10, 20, 30, 255)));
        assert_eq!(parse_color("rgba(10,20,30,0)"), Some(SerializableColor::new(10, 20, 30, 0)));
        assert_eq!(parse_color("rgb(10, 20)"), None);
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_color("Black"), Some(SerializableColor::black()));
        assert_eq!(parse_color("none"), None);
        assert_eq!(parse_color(""), None);
    }

    #[test]
    fn test_with_opacity() {
        let half = SerializableColor::black().with_opacity(0.5);
        assert_eq!(half.a, 127);
        assert_eq!(SerializableColor::white().with_opacity(0.0).a, 0);
    }
}
