#![forbid(unsafe_code)]

//! Background sample-and-draw scheduler.
//!
//! # State machine
//!
//! ```text
//!          enqueue()               cycle done
//!   Idle ────────────▶ Running ──────────────▶ Idle
//!                         │ interrupt observed   ▲
//!                         ▼                      │
//!                    Interrupted ────────────────┘
//! ```
//!
//! [`Collector::enqueue`] blocks until the scheduler is idle, installs a
//! [`CycleRequest`] and wakes the worker. The worker runs every requested
//! source in registration order (sample, then render), checking the shared
//! interrupt flag after each step. A cycle that completes without
//! interruption flushes the compositor once, unless a modal overlay is
//! active or the request asked not to draw. An interrupted cycle never
//! flushes, so the previous frame stays on screen.
//!
//! Between cycles the worker wakes every [`IDLE_POLL`] to give sources an
//! idle tick (the clock uses this).
//!
//! # Failure
//!
//! A sample error is logged and only skips that source's render. A panic or
//! fatal compositor error ends the worker: waiters are released, later
//! requests are dropped, and the failure is raised on the [`AbortSignal`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};
use vitals_core::{AbortSignal, Flag, ThreadFailure};
use vitals_render::Compositor;

use crate::source::{Area, DataSource, RenderContext, SourceError, SourceId};

/// Worker wake-up interval while no cycle is requested.
pub const IDLE_POLL: Duration = Duration::from_millis(100);

/// How long [`Collector::stop`] waits for the worker before detaching it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

const THREAD_NAME: &str = "vitals-collector";

/// Parameters of one sample-and-draw cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRequest {
    /// Sources to run; `None` runs every registered source.
    pub tasks: Option<Vec<SourceId>>,
    /// Flush the compositor when the cycle completes.
    pub draw_now: bool,
    /// Abort the cycle in flight before installing this one.
    pub interrupt: bool,
    /// Sources redraw everything instead of only what changed.
    pub redraw: bool,
    /// Skip sampling; render from the last values.
    pub only_draw: bool,
}

impl Default for CycleRequest {
    fn default() -> Self {
        Self {
            tasks: None,
            draw_now: true,
            interrupt: false,
            redraw: false,
            only_draw: false,
        }
    }
}

impl CycleRequest {
    /// Sample and draw every source.
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    /// Redraw every source from its last values.
    #[must_use]
    pub fn redraw_only() -> Self {
        Self {
            redraw: true,
            only_draw: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn tasks(mut self, tasks: Vec<SourceId>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    #[must_use]
    pub fn interrupting(mut self) -> Self {
        self.interrupt = true;
        self
    }

    #[must_use]
    pub fn redrawing(mut self) -> Self {
        self.redraw = true;
        self
    }

    #[must_use]
    pub fn without_draw(mut self) -> Self {
        self.draw_now = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Interrupted,
}

/// How the last finished cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Flushed,
    NotFlushed,
    Interrupted,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    request: Option<CycleRequest>,
    stopping: bool,
    /// False once the worker has died; requests are then dropped.
    alive: bool,
    cycles: u64,
    last_outcome: Option<CycleOutcome>,
}

struct Shared {
    state: Mutex<State>,
    /// Signals the worker: a request or a stop.
    run: Condvar,
    /// Signals waiters: the worker went idle.
    idle: Condvar,
    interrupt: Flag,
    sources: Mutex<Vec<Box<dyn DataSource>>>,
    compositor: Arc<Compositor>,
    modal: Flag,
    abort: AbortSignal,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sources(&self) -> MutexGuard<'_, Vec<Box<dyn DataSource>>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_cycle(&self, outcome: CycleOutcome) {
        let mut state = self.state();
        state.phase = Phase::Idle;
        state.cycles += 1;
        state.last_outcome = Some(outcome);
        self.idle.notify_all();
    }

    /// Release every waiter after the worker died.
    fn force_idle(&self) {
        let mut state = self.state();
        state.phase = Phase::Idle;
        state.request = None;
        state.alive = false;
        self.idle.notify_all();
    }
}

/// Handle to the sampler thread and its registered sources.
pub struct Collector {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    exited: Option<mpsc::Receiver<()>>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("state", &*self.shared.state())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// A stopped collector; call [`start`](Self::start) after registering
    /// sources.
    pub fn new(compositor: Arc<Compositor>, modal: Flag, abort: AbortSignal) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    request: None,
                    stopping: false,
                    alive: false,
                    cycles: 0,
                    last_outcome: None,
                }),
                run: Condvar::new(),
                idle: Condvar::new(),
                interrupt: Flag::new(),
                sources: Mutex::new(Vec::new()),
                compositor,
                modal,
                abort,
            }),
            handle: None,
            exited: None,
        }
    }

    /// Register a source. Sources run in registration order.
    pub fn register(&self, source: Box<dyn DataSource>) -> SourceId {
        let mut sources = self.shared.sources();
        sources.push(source);
        sources.len() - 1
    }

    /// Id of the first source called `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SourceId> {
        self.shared.sources().iter().position(|s| s.name() == name)
    }

    /// Spawn the worker. A no-op while already running.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.is_running() {
            return Ok(());
        }
        {
            let mut state = self.shared.state();
            state.stopping = false;
            state.alive = true;
            state.phase = Phase::Idle;
            state.request = None;
        }
        let shared = Arc::clone(&self.shared);
        let (exited_tx, exited_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| worker_loop(&shared)));
                let failure = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(ThreadFailure::new("collector", e.to_string())),
                    Err(payload) => Some(ThreadFailure::from_panic("collector", &*payload)),
                };
                shared.force_idle();
                if let Some(failure) = failure {
                    shared.abort.raise(failure);
                }
                let _ = exited_tx.send(());
            });
        match handle {
            Ok(handle) => {
                self.handle = Some(handle);
                self.exited = Some(exited_rx);
                debug!("collector started");
                Ok(())
            }
            Err(e) => {
                self.shared.state().alive = false;
                Err(e)
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Request a cycle. Blocks until the worker is idle; dropped if the
    /// worker is not running.
    pub fn enqueue(&self, request: CycleRequest) {
        if request.interrupt {
            self.shared.interrupt.set();
        }
        let mut state = self.shared.state();
        while state.alive && !state.stopping && (state.phase != Phase::Idle || state.request.is_some())
        {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if !state.alive || state.stopping {
            debug!("collector not running, dropping cycle request");
            return;
        }
        state.request = Some(request);
        state.phase = Phase::Running;
        self.shared.run.notify_all();
    }

    /// Set the interrupt flag without requesting a cycle.
    pub fn interrupt(&self) {
        self.shared.interrupt.set();
    }

    /// The shared interrupt flag polled by sources.
    #[must_use]
    pub fn interrupt_flag(&self) -> &Flag {
        &self.shared.interrupt
    }

    /// Block until the worker is idle or `timeout` passes. Returns whether it
    /// is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let state = self.shared.state();
        let (state, _) = self
            .shared
            .idle
            .wait_timeout_while(state, timeout, |s| {
                s.alive && (s.phase != Phase::Idle || s.request.is_some())
            })
            .unwrap_or_else(PoisonError::into_inner);
        state.phase == Phase::Idle && state.request.is_none()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.shared.state().phase
    }

    /// Completed cycles since creation, interrupted ones included.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.shared.state().cycles
    }

    #[must_use]
    pub fn last_outcome(&self) -> Option<CycleOutcome> {
        self.shared.state().last_outcome
    }

    /// Assign areas to sources. Waits for any cycle in progress.
    pub fn place(&self, layout: impl Fn(&str) -> Option<Area>) {
        for source in self.shared.sources().iter_mut() {
            if let Some(area) = layout(source.name()) {
                source.place(area);
            }
        }
    }

    /// Stop the worker, waiting at most [`STOP_TIMEOUT`] for it to leave a
    /// source. A worker still stuck after that is detached.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state();
            state.stopping = true;
            state.request = None;
            self.shared.run.notify_all();
            self.shared.idle.notify_all();
        }
        self.shared.interrupt.set();
        let Some(handle) = self.handle.take() else {
            return;
        };
        let exited = self
            .exited
            .take()
            .is_some_and(|rx| rx.recv_timeout(STOP_TIMEOUT).is_ok());
        if exited {
            let _ = handle.join();
            debug!("collector stopped");
        } else {
            warn!("collector did not stop in time, detaching");
        }
        let mut state = self.shared.state();
        state.phase = Phase::Idle;
        state.alive = false;
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &Shared) -> std::io::Result<()> {
    loop {
        idle_tick(shared)?;
        let request = {
            let state = shared.state();
            let (mut state, _) = shared
                .run
                .wait_timeout_while(state, IDLE_POLL, |s| !s.stopping && s.request.is_none())
                .unwrap_or_else(PoisonError::into_inner);
            if state.stopping {
                return Ok(());
            }
            state.request.take()
        };
        if let Some(request) = request {
            let outcome = run_cycle(shared, &request)?;
            shared.finish_cycle(outcome);
        }
    }
}

fn run_cycle(shared: &Shared, request: &CycleRequest) -> std::io::Result<CycleOutcome> {
    shared.interrupt.clear();
    let mut sources = shared.sources();
    let ids: Vec<SourceId> = match &request.tasks {
        Some(tasks) => tasks.clone(),
        None => (0..sources.len()).collect(),
    };
    let mut interrupted = false;
    for &id in &ids {
        let Some(source) = sources.get_mut(id) else {
            warn!(id, "cycle requested unknown source");
            continue;
        };
        if !request.only_draw {
            match source.sample(&shared.interrupt) {
                Ok(()) => {}
                Err(SourceError::Interrupted) => {
                    interrupted = true;
                    break;
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "sample failed");
                    continue;
                }
            }
        }
        if shared.interrupt.get() {
            interrupted = true;
            break;
        }
        // The overlay may have opened while this source was sampling.
        let ctx = RenderContext {
            compositor: &shared.compositor,
            redraw: request.redraw,
            modal: shared.modal.get(),
        };
        source.render(&ctx)?;
        if shared.interrupt.get() {
            interrupted = true;
            break;
        }
    }

    if interrupted {
        shared.state().phase = Phase::Interrupted;
        debug!("cycle interrupted");
        return Ok(CycleOutcome::Interrupted);
    }
    if !request.draw_now || shared.modal.get() {
        return Ok(CycleOutcome::NotFlushed);
    }
    if request.tasks.is_some() {
        let names: Vec<&str> = ids
            .iter()
            .filter_map(|&id| sources.get(id))
            .flat_map(|s| s.buffers().iter().copied())
            .collect();
        if names.is_empty() {
            return Ok(CycleOutcome::NotFlushed);
        }
        shared.compositor.flush(&names, false)?;
    } else {
        shared.compositor.flush_all()?;
    }
    Ok(CycleOutcome::Flushed)
}

fn idle_tick(shared: &Shared) -> std::io::Result<()> {
    let mut sources = shared.sources();
    let modal = shared.modal.get();
    let ctx = RenderContext {
        compositor: &shared.compositor,
        redraw: false,
        modal,
    };
    let mut names: Vec<&'static str> = Vec::new();
    for source in sources.iter_mut() {
        if source.idle_tick(&ctx)? {
            names.extend(source.buffers().iter().copied());
        }
    }
    if !names.is_empty() && !modal {
        shared.compositor.flush(&names, false)?;
    }
    Ok(())
}
