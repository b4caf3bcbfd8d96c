#![forbid(unsafe_code)]

//! Render primitives: graphs, meters, boxes, themes, and the frame compositor.

pub mod ansi;
pub mod boxes;
pub mod color;
pub mod compositor;
pub mod glyphs;
pub mod gradient;
pub mod graph;
pub mod meter;
pub mod theme;

pub use boxes::BoxFrame;
pub use color::{ColorParseError, Rgb};
pub use compositor::{Compositor, DEFAULT_Z, WriteOptions};
pub use gradient::{GRADIENT_LEN, Gradient};
pub use graph::{Graph, GraphOptions};
pub use meter::Meter;
pub use theme::{THEME_NAMES, Theme};
