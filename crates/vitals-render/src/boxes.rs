#![forbid(unsafe_code)]

//! Rectangular frames with optional titles.
//!
//! ```text
//! ┌─┤title├──────┐
//! │              │
//! └─┤title2├─────┘
//! ```
//!
//! Coordinates are 1-indexed terminal positions of the top-left corner. The
//! returned string ends with the cursor at the first inner cell.

use unicode_width::UnicodeWidthChar;

use crate::ansi;
use crate::color::{Rgb, fg_or_default};
use crate::glyphs::{
    H_LINE, LEFT_DOWN, LEFT_UP, RIGHT_DOWN, RIGHT_UP, TITLE_LEFT, TITLE_RIGHT, V_LINE,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxFrame {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    title: String,
    bottom_title: String,
    line_color: Option<Rgb>,
    title_color: Option<Rgb>,
    fill: bool,
}

impl BoxFrame {
    #[must_use]
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
            title: String::new(),
            bottom_title: String::new(),
            line_color: None,
            title_color: None,
            fill: true,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_bottom_title(mut self, title: impl Into<String>) -> Self {
        self.bottom_title = title.into();
        self
    }

    #[must_use]
    pub fn with_colors(mut self, line: Option<Rgb>, title: Option<Rgb>) -> Self {
        self.line_color = line;
        self.title_color = title;
        self
    }

    /// Leave the interior untouched instead of blanking it.
    #[must_use]
    pub fn without_fill(mut self) -> Self {
        self.fill = false;
        self
    }

    /// Inner area as (x, y, width, height).
    #[must_use]
    pub fn inner(&self) -> (u16, u16, u16, u16) {
        (
            self.x + 1,
            self.y + 1,
            self.width.saturating_sub(2),
            self.height.saturating_sub(2),
        )
    }

    #[must_use]
    pub fn render(&self) -> String {
        if self.width < 2 || self.height < 2 {
            return String::new();
        }
        let line = fg_or_default(self.line_color);
        let title_fg = fg_or_default(self.title_color);
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        let bottom = y + h - 1;
        let right = x + w - 1;
        let inner = usize::from(w - 2);

        let mut out = line.clone();
        for row in [y, bottom] {
            ansi::push_cursor_to(&mut out, row, x);
            out.push_str(&H_LINE.repeat(usize::from(w - 1)));
        }
        for row in y + 1..bottom {
            ansi::push_cursor_to(&mut out, row, x);
            out.push_str(V_LINE);
            if self.fill {
                out.push_str(&" ".repeat(inner));
            } else if inner > 0 {
                out.push_str(&ansi::cursor_right(w - 2));
            }
            out.push_str(V_LINE);
        }
        for (row, col, glyph) in [
            (y, x, LEFT_UP),
            (y, right, RIGHT_UP),
            (bottom, x, LEFT_DOWN),
            (bottom, right, RIGHT_DOWN),
        ] {
            ansi::push_cursor_to(&mut out, row, col);
            out.push_str(glyph);
        }

        let title_room = usize::from(w.saturating_sub(6));
        for (row, title) in [(y, &self.title), (bottom, &self.bottom_title)] {
            let title = truncate_to_width(title, title_room);
            if title.is_empty() {
                continue;
            }
            ansi::push_cursor_to(&mut out, row, x + 2);
            out.push_str(TITLE_LEFT);
            out.push_str(&title_fg);
            out.push_str(ansi::BOLD);
            out.push_str(title);
            out.push_str(ansi::UNBOLD);
            out.push_str(&line);
            out.push_str(TITLE_RIGHT);
        }

        out.push_str(ansi::FG_DEFAULT);
        ansi::push_cursor_to(&mut out, y + 1, x + 1);
        out
    }
}

/// Longest prefix of `text` that fits in `max` terminal columns.
#[must_use]
pub fn truncate_to_width(text: &str, max: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in text.char_indices() {
        used += ch.width().unwrap_or(0);
        if used > max {
            return &text[..idx];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(s: &str) -> String {
        // Drop CSI sequences, keep glyphs.
        let mut out = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for n in chars.by_ref() {
                    if n.is_ascii_alphabetic() && n != '[' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn corners_and_edges() {
        let out = BoxFrame::new(1, 1, 4, 3).render();
        assert!(out.contains("\x1b[1;1f┌"));
        assert!(out.contains("\x1b[1;4f┐"));
        assert!(out.contains("\x1b[3;1f└"));
        assert!(out.contains("\x1b[3;4f┘"));
        assert!(out.contains("\x1b[2;1f│  │"));
        assert!(out.ends_with("\x1b[2;2f"));
    }

    #[test]
    fn titles_are_bracketed() {
        let out = BoxFrame::new(2, 5, 20, 4)
            .with_title("cpu")
            .with_bottom_title("load")
            .render();
        assert!(out.contains("\x1b[5;4f┤"));
        assert!(out.contains("\x1b[8;4f┤"));
        let plain = strip(&out);
        assert!(plain.contains("┤cpu├"));
        assert!(plain.contains("┤load├"));
    }

    #[test]
    fn unfilled_box_skips_interior() {
        let out = BoxFrame::new(1, 1, 6, 3).without_fill().render();
        assert!(out.contains("│\x1b[4C│"));
    }

    #[test]
    fn degenerate_box_is_empty() {
        assert!(BoxFrame::new(1, 1, 1, 5).render().is_empty());
        assert!(BoxFrame::new(1, 1, 5, 1).render().is_empty());
    }

    #[test]
    fn truncation_counts_columns() {
        assert_eq!(truncate_to_width("memory", 3), "mem");
        assert_eq!(truncate_to_width("日本語", 4), "日本");
        assert_eq!(truncate_to_width("ok", 10), "ok");
    }

    #[test]
    fn inner_area() {
        assert_eq!(BoxFrame::new(3, 4, 10, 5).inner(), (4, 5, 8, 3));
    }
}
