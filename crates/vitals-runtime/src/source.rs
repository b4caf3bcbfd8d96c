#![forbid(unsafe_code)]

//! The data-source contract driven by the [`Collector`](crate::Collector).
//!
//! A source owns its widgets. Each cycle the collector calls
//! [`DataSource::sample`] (skipped for redraw-only cycles) and then
//! [`DataSource::render`], which writes into named compositor buffers. Long
//! samples poll the interrupt flag and return [`SourceError::Interrupted`] so
//! a stale cycle can be abandoned without touching published output.

use std::fmt;
use std::io;

use vitals_core::Flag;
use vitals_render::{Compositor, WriteOptions};

/// Index of a source in registration order.
pub type SourceId = usize;

/// Screen area assigned to a source by the dashboard layout. 1-indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Area {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Area {
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Everything `render` needs for one pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub compositor: &'a Compositor,
    /// Write even if the output matches the previous pass. Set after the
    /// compositor was cleared; sources may skip unchanged writes otherwise.
    pub redraw: bool,
    /// An overlay hides the view; writes go to the snapshot only.
    pub modal: bool,
}

impl RenderContext<'_> {
    /// Base options for writes made during this pass.
    #[must_use]
    pub fn options(&self) -> WriteOptions {
        WriteOptions::new().save_only(self.modal)
    }

    /// Replace buffer `name` with `text`.
    pub fn write(&self, name: &str, text: &str) -> io::Result<()> {
        self.compositor.write(name, text, self.options())
    }
}

/// A metric provider and the widgets that display it.
pub trait DataSource: Send {
    fn name(&self) -> &str;

    /// Compositor buffers this source writes to.
    fn buffers(&self) -> &[&'static str];

    /// Collect fresh values. Must return promptly once `interrupt` is set.
    fn sample(&mut self, interrupt: &Flag) -> Result<(), SourceError>;

    /// Write the current values into the compositor.
    fn render(&mut self, ctx: &RenderContext<'_>) -> io::Result<()>;

    /// Move to a new area; widgets sized by the area are rebuilt on the next
    /// render.
    fn place(&mut self, area: Area) {
        let _ = area;
    }

    /// Called roughly every 100 ms while the collector is otherwise idle.
    /// Returns `true` if it wrote something that should be flushed.
    fn idle_tick(&mut self, ctx: &RenderContext<'_>) -> io::Result<bool> {
        let _ = ctx;
        Ok(false)
    }
}

/// Why a sample produced no new values.
#[derive(Debug)]
pub enum SourceError {
    /// The interrupt flag was observed; results were discarded.
    Interrupted,
    /// The metric is not available on this system.
    Unavailable(String),
    Io(io::Error),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Interrupted => write!(f, "sample interrupted"),
            SourceError::Unavailable(what) => write!(f, "unavailable: {what}"),
            SourceError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io(e) => Some(e),
            SourceError::Interrupted | SourceError::Unavailable(_) => None,
        }
    }
}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> Self {
        SourceError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(SourceError::Interrupted.to_string(), "sample interrupted");
        assert_eq!(
            SourceError::Unavailable("/proc/stat".into()).to_string(),
            "unavailable: /proc/stat"
        );
        let io: SourceError = io::Error::other("boom").into();
        assert!(std::error::Error::source(&io).is_some());
    }

    #[test]
    fn area_emptiness() {
        assert!(Area::default().is_empty());
        assert!(Area::new(1, 1, 0, 4).is_empty());
        assert!(!Area::new(1, 1, 3, 4).is_empty());
    }
}
