#![forbid(unsafe_code)]

//! RGB colors and their truecolor escapes.
//!
//! Accepted notations:
//! - `#RRGGBB`
//! - `#GG`, a grayscale level applied to all three channels
//! - `"r g b"`, three decimal channels separated by spaces

use std::fmt;

use crate::ansi;

/// RGB color (opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub const fn gray(level: u8) -> Self {
        Self::new(level, level, level)
    }

    /// Parse one of the accepted notations.
    pub fn parse(text: &str) -> Result<Self, ColorParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ColorParseError::Empty);
        }
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| ColorParseError::Hex(text.to_string()));
        }
        parse_decimal(text).ok_or_else(|| ColorParseError::Decimal(text.to_string()))
    }

    /// Foreground escape for this color.
    #[must_use]
    pub fn fg(self) -> String {
        ansi::sgr_fg_rgb(self.r, self.g, self.b)
    }

    /// Background escape for this color.
    #[must_use]
    pub fn bg(self) -> String {
        ansi::sgr_bg_rgb(self.r, self.g, self.b)
    }

    pub(crate) fn channels(self) -> [i32; 3] {
        [i32::from(self.r), i32::from(self.g), i32::from(self.b)]
    }

    pub(crate) fn from_channels(ch: [i32; 3]) -> Self {
        let clamp = |v: i32| v.clamp(0, 255) as u8;
        Self::new(clamp(ch[0]), clamp(ch[1]), clamp(ch[2]))
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        2 => byte(hex).map(Rgb::gray),
        6 if hex.is_ascii() => Some(Rgb::new(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
        )),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Rgb> {
    let mut parts = text.split_whitespace().map(str::parse::<u8>);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => Some(Rgb::new(r, g, b)),
        _ => None,
    }
}

/// Parse a color, logging and returning `None` for invalid input so callers
/// can fall back to the terminal default.
#[must_use]
pub fn parse_or_default(text: &str) -> Option<Rgb> {
    match Rgb::parse(text) {
        Ok(rgb) => Some(rgb),
        Err(err) => {
            tracing::warn!(%err, "invalid color, using terminal default");
            None
        }
    }
}

/// Foreground escape for an optional color; the default foreground for `None`.
#[must_use]
pub fn fg_or_default(color: Option<Rgb>) -> String {
    color.map_or_else(|| ansi::FG_DEFAULT.to_string(), Rgb::fg)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    Empty,
    Hex(String),
    Decimal(String),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty color"),
            Self::Hex(s) => write!(f, "invalid hex color {s:?}"),
            Self::Decimal(s) => write!(f, "invalid decimal color {s:?}"),
        }
    }
}

impl std::error::Error for ColorParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex() {
        assert_eq!(Rgb::parse("#50f095"), Ok(Rgb::new(0x50, 0xf0, 0x95)));
        assert_eq!(Rgb::parse("#FA1E1E"), Ok(Rgb::new(0xfa, 0x1e, 0x1e)));
    }

    #[test]
    fn parses_grayscale() {
        assert_eq!(Rgb::parse("#40"), Ok(Rgb::gray(0x40)));
    }

    #[test]
    fn parses_decimal() {
        assert_eq!(Rgb::parse("80 240 149"), Ok(Rgb::new(80, 240, 149)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Rgb::parse(""), Err(ColorParseError::Empty));
        assert!(matches!(Rgb::parse("#12345"), Err(ColorParseError::Hex(_))));
        assert!(matches!(Rgb::parse("#zzzzzz"), Err(ColorParseError::Hex(_))));
        assert!(matches!(Rgb::parse("1 2"), Err(ColorParseError::Decimal(_))));
        assert!(matches!(Rgb::parse("1 2 300"), Err(ColorParseError::Decimal(_))));
        assert_eq!(parse_or_default("nope"), None);
    }

    #[test]
    fn escapes() {
        let c = Rgb::new(1, 2, 3);
        assert_eq!(c.fg(), "\x1b[38;2;1;2;3m");
        assert_eq!(c.bg(), "\x1b[48;2;1;2;3m");
        assert_eq!(fg_or_default(None), ansi::FG_DEFAULT);
        assert_eq!(fg_or_default(Some(c)), c.fg());
    }
}
