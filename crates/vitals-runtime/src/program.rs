#![forbid(unsafe_code)]

//! Tick orchestrator: the main-thread loop tying reader, collector and
//! compositor together.
//!
//! Each tick handles pending OS signals, stamps the [`Timer`], then blocks on
//! the event queue for whatever is left of the interval. Input wakes it early
//! and is handed to the [`Dashboard`]; a handler may shorten the wait with
//! [`TickContext::finish`]. When the deadline passes the collector is asked
//! for a full sample-and-draw cycle.
//!
//! ```text
//! ┌──────────── tick ──────────────────────────────────────────────┐
//! │ abort? ─▶ error   quit? ─▶ stop   suspend? ─▶ stop/continue    │
//! │ resize? ─▶ settle size, interrupt, clear, relayout, finish     │
//! │ stamp ─▶ wait(left) ─▶ events ─▶ Dashboard::handle_event  ↺   │
//! │ deadline passed ─▶ Collector::enqueue(full cycle)              │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A program built with [`Program::headless`] has no terminal session, input
//! reader or signal forwarding; events are pushed into [`Program::queue`]
//! directly. Tests drive the loop that way.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use vitals_core::{AbortSignal, EventQueue, Flag, InputEvent, IoGate, MouseHitMap, ThreadFailure};
#[cfg(unix)]
use vitals_core::terminal_session::{SessionOptions, SignalGuard, TerminalSession, stop_process};
use vitals_core::terminal_session::PendingSignals;
#[cfg(unix)]
use vitals_core::{InputReader, ReaderContext};
use vitals_render::{Compositor, ansi};

use crate::collector::{Collector, CycleRequest};
use crate::source::{DataSource, SourceId};
use crate::timer::Timer;

/// Upper bound on waiting for an interrupted cycle during a resize.
const RESIZE_IDLE_WAIT: Duration = Duration::from_secs(2);

/// What the loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
    Suspend,
}

/// Application hooks called from the main thread.
pub trait Dashboard {
    /// Lay everything out for `cx.size`: place sources, register clickable
    /// regions, draw static chrome. Called at start, after every resize and
    /// after resume, with the hit map and all buffers already cleared.
    fn layout(&mut self, cx: &mut TickContext<'_>) -> io::Result<()>;

    fn handle_event(&mut self, event: InputEvent, cx: &mut TickContext<'_>) -> io::Result<Flow>;

    /// Whether an expired deadline should start a sample cycle.
    fn should_collect(&self) -> bool {
        true
    }
}

/// Handles passed to [`Dashboard`] hooks.
pub struct TickContext<'a> {
    pub compositor: &'a Compositor,
    pub collector: &'a Collector,
    pub hit_map: &'a MouseHitMap,
    /// Set while an overlay hides the view.
    pub modal: &'a Flag,
    pub timer: &'a mut Timer,
    /// Terminal size as (columns, rows).
    pub size: (u16, u16),
    queue: &'a EventQueue,
}

impl TickContext<'_> {
    /// Expire the current interval and wake the loop.
    pub fn finish(&mut self) {
        self.timer.finish();
        self.queue.break_wait();
    }
}

#[derive(Debug, Clone)]
pub struct ProgramConfig {
    pub interval_ms: u64,
    pub mouse: bool,
    pub title: Option<String>,
    /// Size poll period while a resize settles.
    pub resize_poll: Duration,
    /// Longest wait for the size to settle.
    pub resize_settle: Duration,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            mouse: true,
            title: Some("vitals".into()),
            resize_poll: Duration::from_millis(50),
            resize_settle: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
pub enum ProgramError {
    Io(io::Error),
    Thread(ThreadFailure),
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::Io(e) => write!(f, "terminal I/O error: {e}"),
            ProgramError::Thread(failure) => write!(f, "{failure}"),
        }
    }
}

impl std::error::Error for ProgramError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProgramError::Io(e) => Some(e),
            ProgramError::Thread(failure) => Some(failure),
        }
    }
}

impl From<io::Error> for ProgramError {
    fn from(e: io::Error) -> Self {
        ProgramError::Io(e)
    }
}

impl From<ThreadFailure> for ProgramError {
    fn from(failure: ThreadFailure) -> Self {
        ProgramError::Thread(failure)
    }
}

/// Terminal-side resources of an interactive program.
#[cfg(unix)]
struct Attached {
    reader: Option<InputReader>,
    _signals: SignalGuard,
    session: TerminalSession,
}

pub struct Program<D: Dashboard> {
    dashboard: D,
    config: ProgramConfig,
    queue: EventQueue,
    hit_map: MouseHitMap,
    gate: Arc<IoGate>,
    modal: Flag,
    abort: AbortSignal,
    pending: PendingSignals,
    compositor: Arc<Compositor>,
    collector: Collector,
    timer: Timer,
    size: (u16, u16),
    /// The next cycle redraws everything.
    redraw: bool,
    running: bool,
    #[cfg(unix)]
    terminal: Option<Attached>,
}

impl<D: Dashboard> fmt::Debug for Program<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("size", &self.size)
            .field("running", &self.running)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

impl<D: Dashboard> Program<D> {
    /// Take over the controlling terminal.
    ///
    /// # Errors
    ///
    /// Fails before any background thread starts if raw mode, the alternate
    /// screen or the tty cannot be set up.
    #[cfg(unix)]
    pub fn new(dashboard: D, config: ProgramConfig) -> Result<Self, ProgramError> {
        let session = TerminalSession::new(SessionOptions {
            alternate_screen: true,
            mouse: config.mouse,
            title: config.title.clone(),
        })?;
        let size = session.size()?;
        let tty = InputReader::open_tty()?;
        let mut program = Self::build(dashboard, config, Box::new(io::stdout()), size);
        let signals = SignalGuard::new(program.pending.clone(), program.queue.clone())?;
        let reader = InputReader::spawn(tty, program.reader_context())?;
        program.terminal = Some(Attached {
            reader: Some(reader),
            _signals: signals,
            session,
        });
        Ok(program)
    }

    /// A program writing frames to `out` with a fixed size and no terminal.
    pub fn headless(
        dashboard: D,
        config: ProgramConfig,
        out: Box<dyn Write + Send>,
        size: (u16, u16),
    ) -> Self {
        Self::build(dashboard, config, out, size)
    }

    fn build(
        dashboard: D,
        config: ProgramConfig,
        out: Box<dyn Write + Send>,
        size: (u16, u16),
    ) -> Self {
        let queue = EventQueue::new();
        let gate = Arc::new(IoGate::new());
        let modal = Flag::new();
        let abort = AbortSignal::new(queue.clone());
        let compositor = Arc::new(Compositor::new(out, Arc::clone(&gate)));
        let collector = Collector::new(Arc::clone(&compositor), modal.clone(), abort.clone());
        let timer = Timer::new(config.interval_ms);
        Self {
            dashboard,
            config,
            queue,
            hit_map: MouseHitMap::new(),
            gate,
            modal,
            abort,
            pending: PendingSignals::new(),
            compositor,
            collector,
            timer,
            size,
            redraw: true,
            running: false,
            #[cfg(unix)]
            terminal: None,
        }
    }

    #[cfg(unix)]
    fn reader_context(&self) -> ReaderContext {
        ReaderContext {
            queue: self.queue.clone(),
            hit_map: self.hit_map.clone(),
            gate: Arc::clone(&self.gate),
            modal: self.modal.clone(),
            abort: self.abort.clone(),
        }
    }

    /// Register a data source with the collector.
    pub fn register(&self, source: Box<dyn DataSource>) -> SourceId {
        self.collector.register(source)
    }

    /// Run until quit or a fatal error. The terminal is restored before this
    /// returns.
    pub fn run(&mut self) -> Result<(), ProgramError> {
        let result = self.start().and_then(|()| {
            while self.running {
                self.tick()?;
            }
            Ok(())
        });
        self.shutdown();
        result
    }

    /// Start the collector and draw the first layout.
    pub fn start(&mut self) -> Result<(), ProgramError> {
        self.collector.start()?;
        self.running = true;
        self.relayout()?;
        info!(size = ?self.size, interval_ms = self.timer.interval_ms(), "dashboard started");
        Ok(())
    }

    /// One loop iteration: signals, then wait, then maybe a sample cycle.
    pub fn tick(&mut self) -> Result<(), ProgramError> {
        if !self.handle_signals()? {
            return Ok(());
        }
        self.timer.stamp();
        while self.timer.not_zero() {
            let left = self.timer.left();
            if self.queue.wait(left) {
                self.process_events()?;
                if !self.running || self.interrupted() {
                    return Ok(());
                }
            }
        }
        if self.dashboard.should_collect() {
            let mut request = CycleRequest::full();
            request.redraw = std::mem::take(&mut self.redraw);
            self.collector.enqueue(request);
        }
        Ok(())
    }

    /// Stop threads and release the terminal. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.collector.stop();
        #[cfg(unix)]
        {
            if let Some(mut attached) = self.terminal.take() {
                if let Some(mut reader) = attached.reader.take() {
                    reader.stop();
                }
                drop(attached);
            }
        }
        debug!("dashboard shut down");
    }

    fn interrupted(&self) -> bool {
        self.abort.is_raised()
            || self.pending.quit.get()
            || self.pending.suspend.get()
            || self.pending.resize.get()
    }

    /// Returns `false` when the loop should stop.
    fn handle_signals(&mut self) -> Result<bool, ProgramError> {
        if let Some(failure) = self.abort.take() {
            self.running = false;
            return Err(failure.into());
        }
        if self.pending.quit.take() {
            info!("quit requested");
            self.running = false;
            return Ok(false);
        }
        if self.pending.suspend.take() {
            self.suspend()?;
        }
        if self.pending.resize.take() {
            self.resize()?;
        }
        Ok(true)
    }

    fn process_events(&mut self) -> Result<(), ProgramError> {
        for event in self.queue.drain() {
            if matches!(event, InputEvent::Wake) {
                continue;
            }
            let Self {
                dashboard,
                compositor,
                collector,
                hit_map,
                modal,
                timer,
                size,
                queue,
                ..
            } = &mut *self;
            let mut cx = TickContext {
                compositor,
                collector,
                hit_map,
                modal,
                timer,
                size: *size,
                queue,
            };
            match dashboard.handle_event(event, &mut cx)? {
                Flow::Continue => {}
                Flow::Quit => {
                    info!("quit requested");
                    self.running = false;
                    return Ok(());
                }
                Flow::Suspend => self.pending.suspend.set(),
            }
        }
        Ok(())
    }

    fn resize(&mut self) -> Result<(), ProgramError> {
        let size = self.settle_size()?;
        debug!(?size, "terminal resized");
        self.size = size;
        self.collector.interrupt();
        if !self.collector.wait_idle(RESIZE_IDLE_WAIT) {
            warn!("collector still busy after resize interrupt");
        }
        self.relayout()
    }

    /// Poll the size until two reads agree or the settle time runs out.
    fn settle_size(&self) -> io::Result<(u16, u16)> {
        let mut size = self.probe_size()?;
        let deadline = Instant::now() + self.config.resize_settle;
        while Instant::now() < deadline {
            thread::sleep(self.config.resize_poll);
            let next = self.probe_size()?;
            if next == size {
                break;
            }
            size = next;
        }
        Ok(size)
    }

    fn probe_size(&self) -> io::Result<(u16, u16)> {
        #[cfg(unix)]
        {
            if let Some(attached) = &self.terminal {
                return attached.session.size();
            }
        }
        Ok(self.size)
    }

    /// Clear everything size-dependent and let the dashboard lay out again.
    fn relayout(&mut self) -> Result<(), ProgramError> {
        self.hit_map.clear();
        self.compositor.clear(&[], true);
        self.compositor.write_now(ansi::CLEAR)?;
        self.redraw = true;
        let Self {
            dashboard,
            compositor,
            collector,
            hit_map,
            modal,
            timer,
            size,
            queue,
            ..
        } = &mut *self;
        let mut cx = TickContext {
            compositor,
            collector,
            hit_map,
            modal,
            timer,
            size: *size,
            queue,
        };
        dashboard.layout(&mut cx)?;
        cx.finish();
        Ok(())
    }

    #[cfg(unix)]
    fn suspend(&mut self) -> Result<(), ProgramError> {
        let ctx = self.reader_context();
        let Some(attached) = self.terminal.as_mut() else {
            debug!("suspend ignored without a terminal");
            return Ok(());
        };
        info!("suspending");
        if let Some(mut reader) = attached.reader.take() {
            reader.stop();
        }
        self.collector.stop();
        attached.session.suspend();
        stop_process()?;

        attached.session.resume()?;
        attached.reader = Some(InputReader::spawn(InputReader::open_tty()?, ctx)?);
        self.collector.start()?;
        info!("resumed");
        self.pending.resize.set();
        Ok(())
    }

    #[cfg(not(unix))]
    fn suspend(&mut self) -> Result<(), ProgramError> {
        Ok(())
    }

    #[must_use]
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    #[must_use]
    pub fn signals(&self) -> &PendingSignals {
        &self.pending
    }

    #[must_use]
    pub fn compositor(&self) -> &Arc<Compositor> {
        &self.compositor
    }

    #[must_use]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    #[must_use]
    pub fn hit_map(&self) -> &MouseHitMap {
        &self.hit_map
    }

    #[must_use]
    pub fn modal(&self) -> &Flag {
        &self.modal
    }

    #[must_use]
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    #[must_use]
    pub fn size(&self) -> (u16, u16) {
        self.size
    }

    /// Change the size a headless program reports on its next resize.
    pub fn set_size(&mut self, size: (u16, u16)) {
        self.size = size;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn dashboard(&self) -> &D {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut D {
        &mut self.dashboard
    }
}

impl<D: Dashboard> Drop for Program<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
