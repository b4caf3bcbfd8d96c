#![forbid(unsafe_code)]

//! ANSI escape sequence helpers.
//!
//! Widgets build their output as `String`s that the compositor later writes
//! in one piece, so these helpers return or append text rather than writing
//! to a device.
//!
//! # Sequence Reference
//!
//! | Category | Sequence | Description |
//! |----------|----------|-------------|
//! | CSI | `ESC [ line ; col f` | Cursor position (1-indexed) |
//! | CSI | `ESC [ n A/B/C/D` | Cursor up/down/right/left |
//! | CSI | `ESC [ 38;2;r;g;b m` | Truecolor foreground |
//! | CSI | `ESC [ 48;2;r;g;b m` | Truecolor background |
//! | DEC | `ESC 7` / `ESC 8` | Cursor save/restore |

use std::fmt::Write as _;

/// SGR reset: `CSI 0 m`
pub const SGR_RESET: &str = "\x1b[0m";
/// Default foreground: `CSI 39 m`
pub const FG_DEFAULT: &str = "\x1b[39m";
/// Default background: `CSI 49 m`
pub const BG_DEFAULT: &str = "\x1b[49m";
pub const BOLD: &str = "\x1b[1m";
pub const UNBOLD: &str = "\x1b[22m";

pub const CURSOR_SAVE: &str = "\x1b7";
pub const CURSOR_RESTORE: &str = "\x1b8";

/// Clear the screen and home the cursor.
pub const CLEAR: &str = "\x1b[2J\x1b[0;0f";

/// `CSI line ; col f`
#[must_use]
pub fn cursor_to(line: u16, col: u16) -> String {
    format!("\x1b[{line};{col}f")
}

/// Append `CSI line ; col f` to `out`.
pub fn push_cursor_to(out: &mut String, line: u16, col: u16) {
    let _ = write!(out, "\x1b[{line};{col}f");
}

#[must_use]
pub fn cursor_up(n: u16) -> String {
    format!("\x1b[{n}A")
}

#[must_use]
pub fn cursor_down(n: u16) -> String {
    format!("\x1b[{n}B")
}

#[must_use]
pub fn cursor_right(n: u16) -> String {
    format!("\x1b[{n}C")
}

#[must_use]
pub fn cursor_left(n: u16) -> String {
    format!("\x1b[{n}D")
}

/// Truecolor foreground `CSI 38;2;r;g;b m`.
#[must_use]
pub fn sgr_fg_rgb(r: u8, g: u8, b: u8) -> String {
    format!("\x1b[38;2;{r};{g};{b}m")
}

/// Truecolor background `CSI 48;2;r;g;b m`.
#[must_use]
pub fn sgr_bg_rgb(r: u8, g: u8, b: u8) -> String {
    format!("\x1b[48;2;{r};{g};{b}m")
}
