#![forbid(unsafe_code)]

//! Scrolling time-series graph with two samples per terminal column.
//!
//! # Rendering
//!
//! A graph of height `h` is split into `h` bands. For band `i` (0 = top) the
//! thresholds are `high = round(100 * (h - i) / h)` and
//! `low = round(100 * (h - i - 1) / h)` (`100` and `0` for a single row). A
//! sample at or above `high` fills the band (level 4), at or below `low`
//! leaves it empty (level 0), and anything between interpolates linearly. Two
//! adjacent samples give a `(left, right)` level pair that picks one glyph
//! from the [`glyphs`](crate::glyphs) tables.
//!
//! # Double buffer
//!
//! Two row sets are kept and pushes alternate between them. A push drops the
//! oldest cell of every row in the target set and appends the glyph for
//! `(last, new)`, so each set advances one column every two pushes while the
//! visible output advances half a column per push. Row length stays exactly
//! `width` cells.
//!
//! # Colors
//!
//! The palette is percent-indexed (any non-empty length; index
//! `p * (len - 1) / 100`). Multi-row graphs color each band from the palette,
//! top band hottest (reversed for inverted graphs); single-row graphs color
//! the whole row by the most recent sample.

use std::collections::VecDeque;

use crate::ansi;
use crate::glyphs::{GlyphTable, graph_table};

/// Construction options for [`Graph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Draw bars hanging down from the top instead of growing up.
    pub invert: bool,
    /// Raw value that maps to 100%. `None` means samples already are percents.
    pub max_value: Option<i64>,
    /// Added to both the sample and `max_value` before scaling.
    pub offset: i64,
    /// Value the color scale tops out at, independent of `max_value`.
    pub color_max_value: Option<i64>,
}

impl GraphOptions {
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    #[must_use]
    pub fn with_max(mut self, max_value: i64, offset: i64) -> Self {
        self.max_value = Some(max_value).filter(|&m| m > 0);
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_color_max(mut self, color_max_value: i64) -> Self {
        self.color_max_value = Some(color_max_value).filter(|&m| m > 0);
        self
    }
}

type Rows = Vec<VecDeque<&'static str>>;

#[derive(Debug, Clone)]
pub struct Graph {
    width: usize,
    height: usize,
    options: GraphOptions,
    table: &'static GlyphTable,
    palette: Vec<String>,
    /// One color per band, top first; empty for single-row graphs.
    row_colors: Vec<String>,
    buffers: [Rows; 2],
    current: usize,
    last: i64,
    out: String,
}

impl Graph {
    /// Build a graph seeded with `data`. Empty data counts as one zero
    /// sample; data longer than `2 * width` keeps only the newest samples.
    #[must_use]
    pub fn new(width: u16, height: u16, palette: Vec<String>, data: &[i64], options: GraphOptions) -> Self {
        let width = usize::from(width.max(1));
        let height = usize::from(height.max(1));
        let table = graph_table(options.invert, height == 1);

        let mut samples: Vec<i64> = if data.is_empty() { vec![0] } else { data.to_vec() };
        if samples.len() > width * 2 {
            samples.drain(..samples.len() - width * 2);
        }
        if let Some(max) = options.max_value {
            for v in &mut samples {
                *v = scale(*v, max, options.offset).min(100);
            }
        }
        for v in &mut samples {
            *v = (*v).clamp(0, 100);
        }

        let row_colors = if height > 1 && !palette.is_empty() {
            let color_scale = match (options.max_value, options.color_max_value) {
                (Some(max), Some(color_max)) => 100 * max / color_max,
                _ => 100,
            };
            let mut colors: Vec<String> = (1..=height as i64)
                .rev()
                .map(|i| palette_at(&palette, (i * color_scale / height as i64).min(100)).to_string())
                .collect();
            if options.invert {
                colors.reverse();
            }
            colors
        } else {
            Vec::new()
        };

        let value_width = samples.len().div_ceil(2);
        let filler = width - value_width;
        if samples.len() % 2 == 1 {
            samples.insert(0, 0);
        }
        let empty_rows: Rows = (0..height)
            .map(|_| {
                let mut row = VecDeque::with_capacity(width);
                row.extend(std::iter::repeat_n(table[0][0], filler));
                row
            })
            .collect();

        let mut graph = Self {
            width,
            height,
            options,
            table,
            palette,
            row_colors,
            buffers: [empty_rows.clone(), empty_rows],
            current: 1,
            last: 0,
            out: String::new(),
        };
        graph.seed(&samples);
        graph.compose();
        graph
    }

    fn seed(&mut self, samples: &[i64]) {
        for (i, &value) in samples.iter().enumerate() {
            let prev = if i == 0 { 0 } else { samples[i - 1] };
            let target = i % 2;
            for band in 0..self.height {
                let glyph = self.glyph(band, prev, value);
                self.buffers[target][band].push_back(glyph);
            }
        }
        self.current = (samples.len() - 1) % 2;
        self.last = samples.last().copied().unwrap_or(0);
    }

    /// Push a sample and return the recomposed graph. `None` redraws without
    /// changing data.
    pub fn push(&mut self, value: Option<i64>) -> &str {
        let Some(raw) = value else {
            return &self.out;
        };
        let value = self.normalize(raw);
        self.current ^= 1;
        for band in 0..self.height {
            let glyph = self.glyph(band, self.last, value);
            let row = &mut self.buffers[self.current][band];
            row.pop_front();
            row.push_back(glyph);
        }
        self.last = value;
        self.compose();
        &self.out
    }

    /// Current composed output.
    #[must_use]
    pub fn render(&self) -> &str {
        &self.out
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width as u16
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.height as u16
    }

    /// Most recent normalized sample.
    #[must_use]
    pub fn last(&self) -> i64 {
        self.last
    }

    /// Cells in each row of the active buffer.
    #[must_use]
    pub fn row_lengths(&self) -> Vec<usize> {
        self.buffers[self.current].iter().map(VecDeque::len).collect()
    }

    fn normalize(&self, value: i64) -> i64 {
        let value = match self.options.max_value {
            Some(max) if value < max => scale(value, max, self.options.offset),
            Some(_) => 100,
            None => value,
        };
        value.clamp(0, 100)
    }

    fn glyph(&self, band: usize, left: i64, right: i64) -> &'static str {
        let (high, low) = band_thresholds(self.height, band);
        let l = fill_level(self.height, high, low, left);
        let r = fill_level(self.height, high, low, right);
        self.table[l][r]
    }

    fn compose(&mut self) {
        let rows = &self.buffers[self.current];
        let mut out = String::new();
        if self.height == 1 {
            if !self.palette.is_empty() {
                out.push_str(palette_at(&self.palette, self.last));
            }
            out.extend(rows[0].iter().copied());
        } else {
            let next_line = format!("{}{}", ansi::cursor_down(1), ansi::cursor_left(self.width as u16));
            for band in 0..self.height {
                if band > 0 {
                    out.push_str(&next_line);
                }
                if let Some(color) = self.row_colors.get(band) {
                    out.push_str(color);
                }
                let row = if self.options.invert { self.height - 1 - band } else { band };
                out.extend(rows[row].iter().copied());
            }
        }
        if !self.palette.is_empty() {
            out.push_str(ansi::FG_DEFAULT);
        }
        self.out = out;
    }
}

fn scale(value: i64, max: i64, offset: i64) -> i64 {
    let denominator = max + offset;
    if denominator <= 0 {
        return 100;
    }
    ((value + offset) * 100).div_euclid(denominator)
}

/// Entry of a percent-indexed palette of any non-empty length.
fn palette_at(palette: &[String], percent: i64) -> &str {
    let percent = percent.clamp(0, 100) as usize;
    let idx = percent * (palette.len() - 1) / 100;
    &palette[idx]
}

/// Round half to even, as the thresholds were tuned with.
fn round_even(x: f64) -> i64 {
    x.round_ties_even() as i64
}

fn band_thresholds(height: usize, band: usize) -> (i64, i64) {
    if height == 1 {
        return (100, 0);
    }
    let h = height as f64;
    let b = band as f64;
    (
        round_even(100.0 * (h - b) / h),
        round_even(100.0 * (h - (b + 1.0)) / h),
    )
}

fn fill_level(height: usize, high: i64, low: i64, value: i64) -> usize {
    if value >= high {
        4
    } else if value <= low {
        0
    } else if height == 1 {
        round_even(value as f64 * 4.0 / 100.0 + 0.5).clamp(0, 4) as usize
    } else {
        round_even((value - low) as f64 * 4.0 / (high - low) as f64 + 0.1).clamp(0, 4) as usize
    }
}
