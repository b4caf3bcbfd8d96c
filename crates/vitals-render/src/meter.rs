#![forbid(unsafe_code)]

//! Fixed-width percentage bar.
//!
//! Column `i` (1-based) of a `w`-wide meter is filled when
//! `percent >= round(i * 100 / w)` and takes the gradient color at that same
//! index (mirrored for inverted meters). The first unfilled column paints the
//! rest of the bar in the inactive color and stops. Rendered strings are
//! cached per percent and never change for the life of the meter.

use std::collections::HashMap;

use crate::ansi;
use crate::color::{Rgb, fg_or_default};
use crate::glyphs::METER;
use crate::gradient::Gradient;

#[derive(Debug, Clone)]
pub struct Meter {
    width: u16,
    gradient: Gradient,
    inactive: String,
    invert: bool,
    cache: HashMap<u8, String>,
    current: u8,
}

impl Meter {
    #[must_use]
    pub fn new(width: u16, gradient: Gradient, inactive: Option<Rgb>, invert: bool) -> Self {
        Self {
            width,
            gradient,
            inactive: fg_or_default(inactive),
            invert,
            cache: HashMap::new(),
            current: 0,
        }
    }

    /// Render `percent`, clamped to 0..=100.
    pub fn render(&mut self, percent: i64) -> &str {
        let percent = percent.clamp(0, 100) as u8;
        self.current = percent;
        if !self.cache.contains_key(&percent) {
            let out = self.build(percent);
            self.cache.insert(percent, out);
        }
        &self.cache[&percent]
    }

    /// The last rendered bar, or `None` before the first render.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.cache.get(&self.current).map(String::as_str)
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Columns filled at `percent`.
    #[must_use]
    pub fn filled_columns(&self, percent: i64) -> u16 {
        let percent = percent.clamp(0, 100);
        (1..=self.width)
            .take_while(|&i| percent >= self.threshold(i))
            .count() as u16
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn threshold(&self, column: u16) -> i64 {
        (f64::from(column) * 100.0 / f64::from(self.width)).round_ties_even() as i64
    }

    fn build(&self, percent: u8) -> String {
        let percent = i64::from(percent);
        let mut out = String::new();
        for i in 1..=self.width {
            let threshold = self.threshold(i);
            if percent >= threshold {
                let idx = if self.invert {
                    (100.0 - f64::from(i) * 100.0 / f64::from(self.width)).round_ties_even() as i64
                } else {
                    threshold
                };
                out.push_str(&self.gradient.fg(idx));
                out.push_str(METER);
            } else {
                out.push_str(&self.inactive);
                out.push_str(&METER.repeat(usize::from(self.width + 1 - i)));
                break;
            }
        }
        out.push_str(ansi::FG_DEFAULT);
        out
    }
}
