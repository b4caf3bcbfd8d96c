#![forbid(unsafe_code)]

//! Percent-indexed color gradients.
//!
//! A gradient always holds [`GRADIENT_LEN`] entries so any percentage 0..=100
//! maps to a color by direct indexing. It is built from a start color and
//! optional mid and end colors:
//!
//! - start, mid, end: two segments of 50 steps each
//! - start, end: one segment of 100 steps
//! - start only: 101 copies of start
//!
//! Step `i` of a segment is `first + floor(i * (second - first) / steps)` per
//! channel, so the exact end color is approached but only reached as the
//! first entry of the next segment.

use crate::color::Rgb;

/// Entries in every gradient (percent 0 through 100).
pub const GRADIENT_LEN: usize = 101;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gradient {
    colors: Vec<Rgb>,
}

impl Gradient {
    #[must_use]
    pub fn new(start: Rgb, mid: Option<Rgb>, end: Option<Rgb>) -> Self {
        let Some(end) = end else {
            return Self::flat(start);
        };
        let mut colors = Vec::with_capacity(GRADIENT_LEN);
        colors.push(start);
        match mid {
            Some(mid) => {
                push_segment(&mut colors, start, mid, 50);
                push_segment(&mut colors, mid, end, 50);
            }
            None => push_segment(&mut colors, start, end, 100),
        }
        debug_assert_eq!(colors.len(), GRADIENT_LEN);
        Self { colors }
    }

    /// Every entry is `color`.
    #[must_use]
    pub fn flat(color: Rgb) -> Self {
        Self {
            colors: vec![color; GRADIENT_LEN],
        }
    }

    /// Color for `percent`, clamped to 0..=100.
    #[must_use]
    pub fn at(&self, percent: i64) -> Rgb {
        self.colors[percent.clamp(0, 100) as usize]
    }

    /// Foreground escape for `percent`.
    #[must_use]
    pub fn fg(&self, percent: i64) -> String {
        self.at(percent).fg()
    }

    /// All 101 foreground escapes, for widgets that index by percent.
    #[must_use]
    pub fn escapes(&self) -> Vec<String> {
        self.colors.iter().map(|c| c.fg()).collect()
    }

    #[must_use]
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }
}

fn push_segment(colors: &mut Vec<Rgb>, first: Rgb, second: Rgb, steps: i32) {
    let a = first.channels();
    let b = second.channels();
    for i in 0..steps {
        let ch = [0, 1, 2].map(|n| a[n] + (i * (b[n] - a[n])).div_euclid(steps));
        colors.push(Rgb::from_channels(ch));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_stop_gradient() {
        let start = Rgb::new(0, 0, 0);
        let mid = Rgb::new(100, 100, 100);
        let end = Rgb::new(200, 0, 50);
        let g = Gradient::new(start, Some(mid), Some(end));
        assert_eq!(g.colors().len(), GRADIENT_LEN);
        assert_eq!(g.at(0), start);
        assert_eq!(g.at(1), start);
        assert_eq!(g.at(2), Rgb::new(2, 2, 2));
        assert_eq!(g.at(51), mid);
        assert_eq!(g.at(100), Rgb::new(198, 2, 51));
    }

    #[test]
    fn two_stop_gradient() {
        let g = Gradient::new(Rgb::new(0, 0, 0), None, Some(Rgb::new(100, 200, 0)));
        assert_eq!(g.colors().len(), GRADIENT_LEN);
        assert_eq!(g.at(51), Rgb::new(50, 100, 0));
        assert_eq!(g.at(100), Rgb::new(99, 198, 0));
    }

    #[test]
    fn descending_channels_floor() {
        let g = Gradient::new(Rgb::new(10, 0, 0), None, Some(Rgb::new(0, 0, 0)));
        // 10 + floor(1 * -10 / 100) = 10 - 1
        assert_eq!(g.at(2), Rgb::new(9, 0, 0));
    }

    #[test]
    fn start_only_is_flat() {
        let c = Rgb::new(1, 2, 3);
        let g = Gradient::new(c, Some(Rgb::new(9, 9, 9)), None);
        assert!(g.colors().iter().all(|&x| x == c));
    }

    #[test]
    fn out_of_range_percent_clamps() {
        let g = Gradient::new(Rgb::new(0, 0, 0), None, Some(Rgb::new(255, 255, 255)));
        assert_eq!(g.at(-5), g.at(0));
        assert_eq!(g.at(500), g.at(100));
        assert_eq!(g.escapes().len(), GRADIENT_LEN);
    }
}
