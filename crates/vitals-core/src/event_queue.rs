#![forbid(unsafe_code)]

//! Bounded FIFO of classified input events with a "new event" condition.
//!
//! The reader thread pushes, the main loop waits and drains. When the queue
//! holds more than [`EVENT_QUEUE_CAPACITY`] entries the oldest is dropped.
//! A wake can also be posted without an event (pointer motion, signals, an
//! abort request) so the waiting loop re-evaluates its state promptly.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::event::InputEvent;

/// Maximum number of queued events.
pub const EVENT_QUEUE_CAPACITY: usize = 10;

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<InputEvent>,
    /// Set by every push or wake, consumed by [`EventQueue::wait`].
    signaled: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    cond: Condvar,
}

/// Cloneable handle to the shared queue.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    shared: Arc<Shared>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, dropping the oldest on overflow, and signal waiters.
    pub fn push(&self, event: InputEvent) {
        let mut state = self.shared.state.lock().unwrap();
        state.events.push_back(event);
        while state.events.len() > EVENT_QUEUE_CAPACITY {
            let dropped = state.events.pop_front();
            tracing::trace!(?dropped, "event queue overflow");
        }
        state.signaled = true;
        self.shared.cond.notify_all();
    }

    /// Push a synthetic [`InputEvent::Wake`] entry so a waiting loop returns.
    pub fn break_wait(&self) {
        self.push(InputEvent::Wake);
    }

    /// Signal waiters without queuing anything.
    pub fn wake(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.signaled = true;
        self.shared.cond.notify_all();
    }

    /// Block until an event is pushed, a wake is posted, or `timeout` passes.
    ///
    /// Returns `true` when woken by a signal (which is consumed) or when
    /// events are already queued.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if state.signaled || !state.events.is_empty() {
                state.signaled = false;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
    }

    /// Remove and return the oldest event.
    pub fn pop(&self) -> Option<InputEvent> {
        self.shared.state.lock().unwrap().events.pop_front()
    }

    /// Remove and return every queued event, oldest first.
    pub fn drain(&self) -> Vec<InputEvent> {
        self.shared.state.lock().unwrap().events.drain(..).collect()
    }

    pub fn clear(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.events.clear();
        state.signaled = false;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().unwrap().events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
