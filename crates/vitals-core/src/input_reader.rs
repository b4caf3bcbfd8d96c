#![forbid(unsafe_code)]

//! Background thread that turns raw terminal bytes into queued events.
//!
//! # Read cycle
//!
//! 1. `poll(2)` the device for up to [`POLL_INTERVAL`] so a stop request is
//!    noticed promptly, then read one byte.
//! 2. A non-escape byte (plus any UTF-8 continuation) is classified directly.
//! 3. An escape byte marks the reader busy on the [`IoGate`], switches the
//!    device to non-blocking mode, reads up to [`ESCAPE_READ_LIMIT`] more
//!    bytes and, for a mouse report, discards up to [`MOUSE_DRAIN_LIMIT`]
//!    bytes of queued motion reports. Blocking mode is restored before the
//!    busy mark is released.
//!
//! Classified events go to the bounded [`EventQueue`]. Pointer motion only
//! sets the mouse-moved flag and wakes the queue.
//!
//! The thread never terminates the process: an I/O error or panic clears the
//! queue, releases the gate, and raises the [`AbortSignal`].

use std::fs::File;
use std::io::{self, Read};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::event::{InputEvent, MouseAction};
use crate::event_queue::EventQueue;
use crate::hit_map::MouseHitMap;
use crate::input_parser::{
    ESC, MOUSE_LEFT, MOUSE_SCROLL_DOWN, MOUSE_SCROLL_UP, MouseReport, Parsed, classify,
    is_mouse_prefix, utf8_len,
};
use crate::io_gate::IoGate;
use crate::signal::{AbortSignal, Flag, ThreadFailure};

/// How long one blocking wait for input lasts before the stop flag is checked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Continuation bytes read after an escape byte.
pub const ESCAPE_READ_LIMIT: usize = 20;
/// Bytes of mouse-report spam discarded after a mouse report.
pub const MOUSE_DRAIN_LIMIT: usize = 1000;
/// Grace period for the rest of a multi-byte sequence to arrive.
const CONTINUATION_WAIT: Duration = Duration::from_millis(10);

const THREAD_NAME: &str = "vitals-input";

/// Shared state the reader publishes into.
#[derive(Debug, Clone)]
pub struct ReaderContext {
    pub queue: EventQueue,
    pub hit_map: MouseHitMap,
    pub gate: Arc<IoGate>,
    /// Set while a modal overlay occludes the view; clicks then resolve to
    /// [`MouseAction::Click`] regardless of the hit map.
    pub modal: Flag,
    pub abort: AbortSignal,
}

/// Handle to the running reader thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct InputReader {
    stop: Flag,
    mouse_moved: Flag,
    handle: Option<JoinHandle<()>>,
}

impl InputReader {
    /// Open the controlling terminal for reading.
    pub fn open_tty() -> io::Result<File> {
        std::fs::OpenOptions::new().read(true).open("/dev/tty")
    }

    /// Start reading from `tty` on a dedicated thread.
    pub fn spawn(tty: File, ctx: ReaderContext) -> io::Result<Self> {
        let stop = Flag::new();
        let mouse_moved = Flag::new();
        let mut worker = ReaderLoop {
            tty,
            ctx,
            stop: stop.clone(),
            mouse_moved: mouse_moved.clone(),
        };
        let handle = std::thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                tracing::debug!("input reader started");
                let outcome = catch_unwind(AssertUnwindSafe(|| worker.run()));
                let failure = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some(ThreadFailure::new(THREAD_NAME, err.to_string())),
                    Err(payload) => Some(ThreadFailure::from_panic(THREAD_NAME, payload.as_ref())),
                };
                if let Some(failure) = failure {
                    worker.ctx.queue.clear();
                    worker.ctx.gate.force_reader_idle();
                    worker.ctx.abort.raise(failure);
                }
                tracing::debug!("input reader stopped");
            })?;
        Ok(Self {
            stop,
            mouse_moved,
            handle: Some(handle),
        })
    }

    /// Whether pointer motion was reported since the last call.
    pub fn take_mouse_moved(&self) -> bool {
        self.mouse_moved.take()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the thread to stop and wait for it. Returns within roughly one
    /// [`POLL_INTERVAL`].
    pub fn stop(&mut self) {
        self.stop.set();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resolve a decoded mouse report into an event, if it stands for one.
#[must_use]
pub fn resolve_mouse(report: MouseReport, hit_map: &MouseHitMap, modal: bool) -> Option<InputEvent> {
    let action = match report.button {
        MOUSE_LEFT if report.release => {
            if modal {
                MouseAction::Click
            } else {
                hit_map
                    .lookup(report.x, report.y)
                    .map_or(MouseAction::Click, MouseAction::Region)
            }
        }
        MOUSE_SCROLL_UP => MouseAction::ScrollUp,
        MOUSE_SCROLL_DOWN => MouseAction::ScrollDown,
        _ => return None,
    };
    Some(InputEvent::Mouse {
        action,
        x: report.x,
        y: report.y,
    })
}

struct ReaderLoop {
    tty: File,
    ctx: ReaderContext,
    stop: Flag,
    mouse_moved: Flag,
}

impl ReaderLoop {
    fn run(&mut self) -> io::Result<()> {
        while !self.stop.get() {
            if !poll_readable(&self.tty, POLL_INTERVAL)? {
                continue;
            }
            let mut byte = [0u8; 1];
            match (&self.tty).read(&mut byte) {
                Ok(0) => {
                    tracing::debug!("input device closed");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            }
            let seq = if byte[0] == ESC {
                read_escape(&self.tty, &self.ctx.gate)?
            } else {
                read_char(&self.tty, byte[0])?
            };
            self.dispatch(&seq);
        }
        Ok(())
    }

    fn dispatch(&self, seq: &[u8]) {
        match classify(seq) {
            Parsed::Key(key) => self.ctx.queue.push(InputEvent::Key(key)),
            Parsed::Mouse(report) => {
                if let Some(event) = resolve_mouse(report, &self.ctx.hit_map, self.ctx.modal.get())
                {
                    self.ctx.queue.push(event);
                }
            }
            Parsed::Motion => {
                self.mouse_moved.set();
                self.ctx.queue.wake();
            }
            Parsed::Unrecognized => {
                tracing::trace!(bytes = ?seq, "dropping unrecognized input");
            }
        }
    }
}

fn read_escape(tty: &File, gate: &IoGate) -> io::Result<Vec<u8>> {
    let _busy = gate.begin_read();
    let mut seq = vec![ESC];
    if !poll_readable(tty, CONTINUATION_WAIT)? {
        return Ok(seq);
    }
    let _nonblocking = NonBlocking::enable(tty)?;
    read_available(tty, &mut seq, ESCAPE_READ_LIMIT + 1)?;
    if is_mouse_prefix(&seq) {
        let mut spam = Vec::new();
        read_available(tty, &mut spam, MOUSE_DRAIN_LIMIT)?;
        if !spam.is_empty() {
            tracing::trace!(bytes = spam.len(), "drained mouse reports");
        }
    }
    Ok(seq)
}

fn read_char(tty: &File, lead: u8) -> io::Result<Vec<u8>> {
    let mut seq = vec![lead];
    let len = utf8_len(lead);
    while seq.len() < len {
        if !poll_readable(tty, CONTINUATION_WAIT)? {
            break;
        }
        let mut byte = [0u8; 1];
        match (&*tty).read(&mut byte) {
            Ok(0) => break,
            Ok(_) => seq.push(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(seq)
}

/// Read from a non-blocking `tty` until it runs dry or `buf` holds `limit`
/// bytes.
fn read_available(tty: &File, buf: &mut Vec<u8>, limit: usize) -> io::Result<()> {
    let mut chunk = [0u8; 256];
    while buf.len() < limit {
        let want = (limit - buf.len()).min(chunk.len());
        match (&*tty).read(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Wait up to `timeout` for `tty` to become readable. `EINTR` counts as a
/// timeout.
#[cfg(unix)]
fn poll_readable(tty: &File, timeout: Duration) -> io::Result<bool> {
    use std::os::fd::AsFd;
    let mut poll_fds = [nix::poll::PollFd::new(
        tty.as_fd(),
        nix::poll::PollFlags::POLLIN,
    )];
    let timeout_ms: u16 = timeout.as_millis().try_into().unwrap_or(u16::MAX);
    match nix::poll::poll(&mut poll_fds, nix::poll::PollTimeout::from(timeout_ms)) {
        Ok(n) => Ok(n > 0),
        Err(nix::errno::Errno::EINTR) => Ok(false),
        Err(e) => Err(io::Error::other(e)),
    }
}

/// Restores the original file status flags on drop.
#[cfg(unix)]
struct NonBlocking<'a> {
    tty: &'a File,
    original: rustix::fs::OFlags,
}

#[cfg(unix)]
impl<'a> NonBlocking<'a> {
    fn enable(tty: &'a File) -> io::Result<Self> {
        let original = rustix::fs::fcntl_getfl(tty)?;
        rustix::fs::fcntl_setfl(tty, original | rustix::fs::OFlags::NONBLOCK)?;
        Ok(Self { tty, original })
    }
}

#[cfg(unix)]
impl Drop for NonBlocking<'_> {
    fn drop(&mut self) {
        if let Err(err) = rustix::fs::fcntl_setfl(self.tty, self.original) {
            tracing::warn!(%err, "failed to restore blocking mode");
        }
    }
}
