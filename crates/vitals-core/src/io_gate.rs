#![forbid(unsafe_code)]

//! Mutual exclusion between terminal writes and escape-sequence reads.
//!
//! The reader marks itself busy while it is collecting the continuation of
//! an escape sequence (the device is briefly non-blocking then). The
//! compositor marks itself writing for the duration of one physical write.
//! Both transitions happen under one mutex, so a write is entered only when
//! the reader is idle and no other write is in flight, and the reader never
//! goes busy while a write is in progress.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct GateState {
    reader_busy: bool,
    writing: bool,
}

#[derive(Debug, Default)]
pub struct IoGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl IoGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the reader busy, waiting first for any in-flight write.
    pub fn begin_read(&self) -> ReadGuard<'_> {
        let mut state = self.state.lock().unwrap();
        while state.writing {
            state = self.changed.wait(state).unwrap();
        }
        state.reader_busy = true;
        ReadGuard { gate: self }
    }

    /// Enter the write section once the reader is idle and no other write
    /// is running.
    pub fn begin_write(&self) -> WriteGuard<'_> {
        let mut state = self.state.lock().unwrap();
        while state.reader_busy || state.writing {
            state = self.changed.wait(state).unwrap();
        }
        state.writing = true;
        WriteGuard { gate: self }
    }

    /// Wait up to `timeout` for the reader to go idle.
    ///
    /// Returns `true` if the reader is idle on return.
    pub fn wait_reader_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        while state.reader_busy {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.changed.wait_timeout(state, deadline - now).unwrap();
            state = guard;
        }
        true
    }

    #[must_use]
    pub fn is_reader_busy(&self) -> bool {
        self.state.lock().unwrap().reader_busy
    }

    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.state.lock().unwrap().writing
    }

    /// Clear the reader's busy mark unconditionally. Used when the reader
    /// thread dies so no writer waits forever.
    pub fn force_reader_idle(&self) {
        let mut state = self.state.lock().unwrap();
        state.reader_busy = false;
        self.changed.notify_all();
    }
}

/// Held by the reader while an escape continuation is being collected.
#[derive(Debug)]
pub struct ReadGuard<'a> {
    gate: &'a IoGate,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.gate.force_reader_idle();
    }
}

/// Held by the compositor for one physical write.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    gate: &'a IoGate,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.state.lock().unwrap();
        state.writing = false;
        self.gate.changed.notify_all();
    }
}
