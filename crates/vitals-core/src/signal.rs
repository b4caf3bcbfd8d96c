#![forbid(unsafe_code)]

//! Shared flags and the cross-thread abort path.
//!
//! Background threads never exit the process. When one of them hits a fatal
//! condition it records a [`ThreadFailure`] in the [`AbortSignal`], which also
//! wakes the main loop through the event queue; the main loop then restores
//! the terminal and exits.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::event_queue::EventQueue;

/// A cloneable boolean shared between threads.
#[derive(Debug, Clone, Default)]
pub struct Flag(Arc<AtomicBool>);

impl Flag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn store(&self, value: bool) {
        self.0.store(value, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Read and clear in one step.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// A background thread stopped because of an unrecoverable error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadFailure {
    pub thread: &'static str,
    pub message: String,
}

impl ThreadFailure {
    pub fn new(thread: &'static str, message: impl Into<String>) -> Self {
        Self {
            thread,
            message: message.into(),
        }
    }

    /// Build a failure from a caught panic payload.
    #[must_use]
    pub fn from_panic(thread: &'static str, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        Self::new(thread, message)
    }
}

impl fmt::Display for ThreadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} thread failed: {}", self.thread, self.message)
    }
}

impl std::error::Error for ThreadFailure {}

/// Records the first fatal background failure and wakes the main loop.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    failure: Arc<Mutex<Option<ThreadFailure>>>,
    queue: EventQueue,
}

impl AbortSignal {
    #[must_use]
    pub fn new(queue: EventQueue) -> Self {
        Self {
            failure: Arc::new(Mutex::new(None)),
            queue,
        }
    }

    /// Request a process-wide shutdown. Only the first failure is kept.
    pub fn raise(&self, failure: ThreadFailure) {
        tracing::error!(thread = failure.thread, message = %failure.message, "requesting shutdown");
        {
            let mut slot = self.failure.lock().unwrap();
            if slot.is_none() {
                *slot = Some(failure);
            }
        }
        self.queue.wake();
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.failure.lock().unwrap().is_some()
    }

    pub fn take(&self) -> Option<ThreadFailure> {
        self.failure.lock().unwrap().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn flag_take_clears() {
        let flag = Flag::new();
        let other = flag.clone();
        other.set();
        assert!(flag.get());
        assert!(flag.take());
        assert!(!other.get());
    }

    #[test]
    fn abort_keeps_first_failure_and_wakes() {
        let queue = EventQueue::new();
        let abort = AbortSignal::new(queue.clone());
        abort.raise(ThreadFailure::new("reader", "first"));
        abort.raise(ThreadFailure::new("collector", "second"));
        assert!(queue.wait(Duration::ZERO));
        assert!(abort.is_raised());
        let failure = abort.take().unwrap();
        assert_eq!(failure.thread, "reader");
        assert_eq!(failure.to_string(), "reader thread failed: first");
        assert!(abort.take().is_none());
    }

    #[test]
    fn panic_payload_messages() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(ThreadFailure::from_panic("x", payload.as_ref()).message, "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(ThreadFailure::from_panic("x", payload.as_ref()).message, "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(
            ThreadFailure::from_panic("x", payload.as_ref()).message,
            "panic with non-string payload"
        );
    }
}
