#![forbid(unsafe_code)]

//! Named, z-ordered text buffers merged into one terminal write per flush.
//!
//! Producers on any thread write fragments under a buffer name. A flush
//! concatenates the selected live buffers by descending z (ties in creation
//! order), records the result of every `persist` buffer as its snapshot,
//! drops `once` buffers, and writes the whole frame with a single guarded
//! device write.
//!
//! # Buffer flags
//!
//! | Flag | Effect |
//! |------|--------|
//! | `persist` (default) | flushed text becomes the buffer's snapshot |
//! | `once` | live text is dropped after the next flush that includes it |
//! | `save_only` | text goes straight to the snapshot, never to the screen |
//!
//! # Device writes
//!
//! Every physical write holds the [`IoGate`] write section, so it never
//! overlaps the input reader's escape-sequence reads. A write that reports
//! `WouldBlock` is retried once after waiting for the reader to go idle; a
//! second failure is returned to the caller as fatal.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vitals_core::IoGate;

/// Z used when a buffer is created without an explicit z.
pub const DEFAULT_Z: i32 = 100;

/// Upper bound on the wait before the single retry of a blocked write.
const RETRY_WAIT: Duration = Duration::from_millis(500);

/// How a [`Compositor::write`] treats its fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub append: bool,
    pub flush_now: bool,
    /// New z for the buffer; `None` keeps the current one (or [`DEFAULT_Z`]).
    pub z: Option<i32>,
    pub persist: bool,
    pub once: bool,
    pub save_only: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            append: false,
            flush_now: false,
            z: None,
            persist: true,
            once: false,
            save_only: false,
        }
    }
}

impl WriteOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }

    #[must_use]
    pub fn now(mut self) -> Self {
        self.flush_now = true;
        self
    }

    #[must_use]
    pub fn z(mut self, z: i32) -> Self {
        self.z = Some(z);
        self
    }

    #[must_use]
    pub fn no_persist(mut self) -> Self {
        self.persist = false;
        self
    }

    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    #[must_use]
    pub fn save_only(mut self, save_only: bool) -> Self {
        self.save_only = save_only;
        self
    }
}

#[derive(Debug)]
struct Slot {
    z: i32,
    seq: u64,
    live: Option<String>,
    saved: Option<String>,
    persist: bool,
    once: bool,
}

#[derive(Debug, Default)]
struct Buffers {
    slots: HashMap<String, Slot>,
    next_seq: u64,
}

impl Buffers {
    fn slot(&mut self, name: &str) -> &mut Slot {
        let next_seq = &mut self.next_seq;
        self.slots.entry(name.to_string()).or_insert_with(|| {
            let seq = *next_seq;
            *next_seq += 1;
            Slot {
                z: DEFAULT_Z,
                seq,
                live: None,
                saved: None,
                persist: true,
                once: false,
            }
        })
    }

    /// Names ordered for compositing: descending z, then creation order.
    fn ordered(&self, include: impl Fn(&str, &Slot) -> bool) -> Vec<String> {
        let mut names: Vec<(&String, &Slot)> = self
            .slots
            .iter()
            .filter(|(name, slot)| include(name, slot))
            .collect();
        names.sort_by_key(|(_, slot)| (Reverse(slot.z), slot.seq));
        names.into_iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Shared frame compositor. Cheap to share behind an `Arc`.
pub struct Compositor {
    buffers: Mutex<Buffers>,
    out: Mutex<Box<dyn Write + Send>>,
    gate: Arc<IoGate>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

impl Compositor {
    pub fn new(out: Box<dyn Write + Send>, gate: Arc<IoGate>) -> Self {
        Self {
            buffers: Mutex::new(Buffers::default()),
            out: Mutex::new(out),
            gate,
        }
    }

    /// Compositor writing to the process's stdout.
    #[must_use]
    pub fn stdout(gate: Arc<IoGate>) -> Self {
        Self::new(Box::new(io::stdout()), gate)
    }

    #[must_use]
    pub fn gate(&self) -> &Arc<IoGate> {
        &self.gate
    }

    /// Store `text` under `name`.
    ///
    /// # Errors
    ///
    /// Only when `flush_now` is set and the device write fails.
    pub fn write(&self, name: &str, text: &str, opts: WriteOptions) -> io::Result<()> {
        {
            let mut buffers = self.buffers.lock().unwrap();
            let slot = buffers.slot(name);
            if let Some(z) = opts.z {
                slot.z = z;
            }
            let target = if opts.save_only {
                &mut slot.saved
            } else {
                slot.persist = opts.persist;
                slot.once = opts.once;
                &mut slot.live
            };
            if opts.append {
                target.get_or_insert_with(String::new).push_str(text);
            } else {
                *target = Some(text.to_string());
            }
        }
        if opts.flush_now && !opts.save_only {
            self.flush(&[name], false)?;
        }
        Ok(())
    }

    /// Composite the named buffers (all when `names` is empty) and write them.
    ///
    /// Does nothing if no selected buffer has live content.
    pub fn flush(&self, names: &[&str], clear_after: bool) -> io::Result<()> {
        let frame = {
            let mut buffers = self.buffers.lock().unwrap();
            let order = buffers.ordered(|name, slot| {
                slot.live.is_some() && (names.is_empty() || names.contains(&name))
            });
            if order.is_empty() {
                return Ok(());
            }
            let mut frame = String::new();
            for name in &order {
                let slot = buffers.slot(name);
                let Some(text) = slot.live.take() else {
                    continue;
                };
                frame.push_str(&text);
                if slot.persist {
                    slot.saved = Some(text.clone());
                }
                if clear_after || slot.once {
                    slot.once = false;
                } else {
                    slot.live = Some(text);
                }
            }
            frame
        };
        self.write_device(frame.as_bytes())
    }

    /// Flush every live buffer.
    pub fn flush_all(&self) -> io::Result<()> {
        self.flush(&[], false)
    }

    /// Concatenation of all snapshots in compositing order.
    #[must_use]
    pub fn snapshot(&self) -> String {
        let buffers = self.buffers.lock().unwrap();
        buffers
            .ordered(|_, slot| slot.saved.is_some())
            .iter()
            .filter_map(|name| buffers.slots[name].saved.as_deref())
            .collect()
    }

    /// Write the snapshot to the device, e.g. to restore the view behind a
    /// closed overlay.
    pub fn redraw_snapshot(&self) -> io::Result<()> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Ok(());
        }
        self.write_device(snapshot.as_bytes())
    }

    /// Drop live content of the named buffers (all when `names` is empty),
    /// and their snapshots and z too when `also_snapshot` is set.
    pub fn clear(&self, names: &[&str], also_snapshot: bool) {
        let mut buffers = self.buffers.lock().unwrap();
        if also_snapshot {
            buffers
                .slots
                .retain(|name, _| !(names.is_empty() || names.contains(&name.as_str())));
            return;
        }
        for (name, slot) in &mut buffers.slots {
            if names.is_empty() || names.contains(&name.as_str()) {
                slot.live = None;
                slot.once = false;
            }
        }
    }

    /// Write bytes outside the buffer model, through the same gate.
    pub fn write_now(&self, text: &str) -> io::Result<()> {
        self.write_device(text.as_bytes())
    }

    /// Live content of a buffer.
    #[must_use]
    pub fn live(&self, name: &str) -> Option<String> {
        self.buffers.lock().unwrap().slots.get(name)?.live.clone()
    }

    /// Snapshot content of a buffer.
    #[must_use]
    pub fn saved(&self, name: &str) -> Option<String> {
        self.buffers.lock().unwrap().slots.get(name)?.saved.clone()
    }

    /// Whether `name` currently has live content.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.buffers
            .lock()
            .unwrap()
            .slots
            .get(name)
            .is_some_and(|slot| slot.live.is_some())
    }

    fn write_device(&self, bytes: &[u8]) -> io::Result<()> {
        let _section = self.gate.begin_write();
        let mut out = self.out.lock().unwrap();
        write_frame(&mut **out, bytes, &self.gate)
    }
}

/// Write all of `bytes`, retrying once on `WouldBlock`.
fn write_frame(out: &mut dyn Write, bytes: &[u8], gate: &IoGate) -> io::Result<()> {
    let mut written = 0;
    let mut retried = false;
    let mut flushed = false;
    while written < bytes.len() || !flushed {
        let result = if written < bytes.len() {
            out.write(&bytes[written..]).map(|n| {
                written += n;
                n
            })
        } else {
            out.flush().map(|()| {
                flushed = true;
                1
            })
        };
        match result {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock && !retried => {
                retried = true;
                tracing::warn!(written, total = bytes.len(), "terminal write would block, retrying");
                gate.wait_reader_idle(RETRY_WAIT);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
