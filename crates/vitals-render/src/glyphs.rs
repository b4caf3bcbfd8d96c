#![forbid(unsafe_code)]

//! Fixed glyph tables.
//!
//! Graph tables are indexed `[left][right]` by the fill level (0..=4) of two
//! adjacent samples within one character band, so each braille cell shows two
//! samples side by side. The "small" variants are used for single-row graphs
//! and replace the empty glyph with a cursor-right move so the row does not
//! paint over whatever is behind it.

pub type GlyphTable = [[&'static str; 5]; 5];

/// Bars growing upward from the bottom of the band.
pub const GRAPH_UP: GlyphTable = [
    [" ", "⢀", "⢠", "⢰", "⢸"],
    ["⡀", "⣀", "⣠", "⣰", "⣸"],
    ["⡄", "⣄", "⣤", "⣴", "⣼"],
    ["⡆", "⣆", "⣦", "⣶", "⣾"],
    ["⡇", "⣇", "⣧", "⣷", "⣿"],
];

/// Bars hanging downward from the top of the band.
pub const GRAPH_DOWN: GlyphTable = [
    [" ", "⠈", "⠘", "⠸", "⢸"],
    ["⠁", "⠉", "⠙", "⠹", "⢹"],
    ["⠃", "⠋", "⠛", "⠻", "⢻"],
    ["⠇", "⠏", "⠟", "⠿", "⢿"],
    ["⡇", "⡏", "⡟", "⡿", "⣿"],
];

/// Cursor-right by one cell; the empty glyph of the small tables.
pub const SKIP_CELL: &str = "\x1b[1C";

pub const GRAPH_UP_SMALL: GlyphTable = with_empty(GRAPH_UP, SKIP_CELL);
pub const GRAPH_DOWN_SMALL: GlyphTable = with_empty(GRAPH_DOWN, SKIP_CELL);

const fn with_empty(mut table: GlyphTable, empty: &'static str) -> GlyphTable {
    table[0][0] = empty;
    table
}

/// Pick the table for a graph's orientation and height.
#[must_use]
pub fn graph_table(invert: bool, single_row: bool) -> &'static GlyphTable {
    match (invert, single_row) {
        (false, false) => &GRAPH_UP,
        (true, false) => &GRAPH_DOWN,
        (false, true) => &GRAPH_UP_SMALL,
        (true, true) => &GRAPH_DOWN_SMALL,
    }
}

/// Meter cell.
pub const METER: &str = "■";

// Box drawing.
pub const H_LINE: &str = "─";
pub const V_LINE: &str = "│";
pub const LEFT_UP: &str = "┌";
pub const RIGHT_UP: &str = "┐";
pub const LEFT_DOWN: &str = "└";
pub const RIGHT_DOWN: &str = "┘";
pub const TITLE_LEFT: &str = "┤";
pub const TITLE_RIGHT: &str = "├";
pub const DIV_UP: &str = "┬";
pub const DIV_DOWN: &str = "┴";
