#![forbid(unsafe_code)]

//! Clickable regions keyed by the logical key they stand for.
//!
//! Layout code rebuilds the map whenever it draws something clickable; the
//! reader consults it only for left-button releases. Regions are tested in
//! registration order and the first match wins.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::event::Key;

#[derive(Debug, Default)]
struct Regions {
    entries: Vec<(Key, HashSet<(u16, u16)>)>,
}

impl Regions {
    fn cells_mut(&mut self, key: Key) -> &mut HashSet<(u16, u16)> {
        let idx = match self.entries.iter().position(|(k, _)| *k == key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key, HashSet::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }
}

/// Cloneable handle to the shared hit map.
#[derive(Debug, Clone, Default)]
pub struct MouseHitMap {
    inner: Arc<Mutex<Regions>>,
}

impl MouseHitMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `width` x `height` rectangle whose top-left cell is
    /// (`x`, `y`), 1-indexed.
    pub fn add_rect(&self, key: Key, x: u16, y: u16, width: u16, height: u16) {
        let mut regions = self.inner.lock().unwrap();
        let cells = regions.cells_mut(key);
        for row in y..y.saturating_add(height) {
            for col in x..x.saturating_add(width) {
                cells.insert((col, row));
            }
        }
    }

    /// Register a horizontal run of `width` cells, the common case for a
    /// clickable label.
    pub fn add_span(&self, key: Key, x: u16, y: u16, width: u16) {
        self.add_rect(key, x, y, width, 1);
    }

    pub fn remove(&self, key: Key) {
        self.inner.lock().unwrap().entries.retain(|(k, _)| *k != key);
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().entries.clear();
    }

    /// The key registered for the cell at (`x`, `y`), if any.
    #[must_use]
    pub fn lookup(&self, x: u16, y: u16) -> Option<Key> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .find(|(_, cells)| cells.contains(&(x, y)))
            .map(|(key, _)| *key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }
}
