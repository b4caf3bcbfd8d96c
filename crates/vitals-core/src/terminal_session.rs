#![forbid(unsafe_code)]

//! Terminal session lifecycle guard.
//!
//! [`TerminalSession`] enters raw mode and the alternate screen, hides the
//! cursor and enables SGR mouse reporting. Everything is undone in reverse
//! order on [`TerminalSession::suspend`] and on drop, and a panic hook makes a
//! best-effort restore before the panic message is printed.
//!
//! # Escape sequences
//!
//! | Feature | Enable | Disable |
//! |---------|--------|---------|
//! | Alternate screen | `CSI ? 1049 h` | `CSI ? 1049 l` |
//! | Mouse (button events, urxvt, SGR) | `CSI ? 1002 h` `CSI ? 1015 h` `CSI ? 1006 h` | same with `l`, plus `CSI ? 1003 l` |
//! | Cursor | `CSI ? 25 h` | `CSI ? 25 l` |
//!
//! OS signals are not handled here directly: [`SignalGuard`] forwards them to
//! [`PendingSignals`] flags and wakes the main loop, which decides what to do.

use std::io::{self, Write};
use std::sync::OnceLock;

use crate::event_queue::EventQueue;
use crate::signal::Flag;

#[cfg(unix)]
use signal_hook::consts::signal::{SIGINT, SIGTERM, SIGTSTP, SIGWINCH};
#[cfg(unix)]
use signal_hook::iterator::Signals;

const MOUSE_ENABLE: &[u8] = b"\x1b[?1002h\x1b[?1015h\x1b[?1006h";
const MOUSE_DISABLE: &[u8] = b"\x1b[?1002l\x1b[?1003l\x1b[?1015l\x1b[?1006l";

/// Which modes a session enables.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub alternate_screen: bool,
    pub mouse: bool,
    /// Window title to set, if any.
    pub title: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            alternate_screen: true,
            mouse: true,
            title: None,
        }
    }
}

/// Owns raw mode and the screen modes for the lifetime of the dashboard.
#[derive(Debug)]
pub struct TerminalSession {
    options: SessionOptions,
    raw_enabled: bool,
    alternate_screen_enabled: bool,
    mouse_enabled: bool,
}

impl TerminalSession {
    /// Enter raw mode and the configured screen modes.
    ///
    /// # Errors
    ///
    /// Fails if raw mode or the alternate screen cannot be set up. Anything
    /// already enabled is rolled back before the error is returned.
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        install_panic_hook();
        let mut session = Self {
            options,
            raw_enabled: false,
            alternate_screen_enabled: false,
            mouse_enabled: false,
        };
        session.enter()?;
        Ok(session)
    }

    fn enter(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout();

        if let Err(err) = self.enter_modes(&mut stdout) {
            self.cleanup();
            return Err(err);
        }
        Ok(())
    }

    fn enter_modes(&mut self, stdout: &mut io::Stdout) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        self.raw_enabled = true;
        tracing::debug!("raw mode enabled");

        if self.options.alternate_screen {
            crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
            self.alternate_screen_enabled = true;
            tracing::debug!("alternate screen enabled");
        }

        crossterm::execute!(
            stdout,
            crossterm::cursor::Hide,
            crossterm::terminal::Clear(crossterm::terminal::ClearType::All),
            crossterm::cursor::MoveTo(0, 0)
        )?;

        if let Some(title) = &self.options.title {
            crossterm::execute!(stdout, crossterm::terminal::SetTitle(title))?;
        }

        if self.options.mouse {
            stdout.write_all(MOUSE_ENABLE)?;
            stdout.flush()?;
            self.mouse_enabled = true;
            tracing::debug!("mouse reporting enabled");
        }
        Ok(())
    }

    /// Current terminal size as (columns, rows).
    pub fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Restore the terminal so the process can be stopped.
    pub fn suspend(&mut self) {
        self.cleanup();
    }

    /// Re-enter every mode after [`suspend`](Self::suspend).
    pub fn resume(&mut self) -> io::Result<()> {
        self.enter()
    }

    /// Disable everything that was enabled, in reverse order.
    fn cleanup(&mut self) {
        let mut stdout = io::stdout();

        if self.mouse_enabled {
            let _ = stdout.write_all(MOUSE_DISABLE);
            self.mouse_enabled = false;
            tracing::debug!("mouse reporting disabled");
        }

        let _ = crossterm::execute!(stdout, crossterm::cursor::Show);

        if self.alternate_screen_enabled {
            let _ = crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen);
            self.alternate_screen_enabled = false;
            tracing::debug!("alternate screen disabled");
        }

        if self.raw_enabled {
            let _ = crossterm::terminal::disable_raw_mode();
            self.raw_enabled = false;
            tracing::debug!("raw mode disabled");
        }

        let _ = stdout.flush();
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            best_effort_cleanup();
            previous(info);
        }));
    });
}

fn best_effort_cleanup() {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(MOUSE_DISABLE);
    let _ = crossterm::execute!(stdout, crossterm::cursor::Show);
    let _ = crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen);
    let _ = crossterm::terminal::disable_raw_mode();
    let _ = stdout.flush();
}

/// Stop the whole process (`SIGSTOP`); returns once it is continued.
#[cfg(unix)]
pub fn stop_process() -> io::Result<()> {
    signal_hook::low_level::raise(signal_hook::consts::signal::SIGSTOP)
}

/// OS signals received but not yet handled by the main loop.
#[derive(Debug, Clone, Default)]
pub struct PendingSignals {
    /// Window size changed.
    pub resize: Flag,
    /// Interrupt or terminate requested.
    pub quit: Flag,
    /// Terminal stop requested.
    pub suspend: Flag,
}

impl PendingSignals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Forwards `SIGWINCH`, `SIGTSTP`, `SIGINT` and `SIGTERM` into
/// [`PendingSignals`] from a dedicated thread. Handlers are removed on drop.
#[cfg(unix)]
#[derive(Debug)]
pub struct SignalGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl SignalGuard {
    pub fn new(pending: PendingSignals, queue: EventQueue) -> io::Result<Self> {
        let mut signals =
            Signals::new([SIGINT, SIGTERM, SIGWINCH, SIGTSTP]).map_err(io::Error::other)?;
        let handle = signals.handle();
        let thread = std::thread::Builder::new()
            .name("vitals-signals".into())
            .spawn(move || {
                for signal in signals.forever() {
                    match signal {
                        SIGWINCH => {
                            tracing::debug!("SIGWINCH received");
                            pending.resize.set();
                        }
                        SIGTSTP => {
                            tracing::debug!("SIGTSTP received");
                            pending.suspend.set();
                        }
                        SIGINT | SIGTERM => {
                            tracing::info!(signal, "termination signal received");
                            pending.quit.set();
                        }
                        _ => continue,
                    }
                    queue.wake();
                }
            })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

#[cfg(unix)]
impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn default_options_enable_screen_and_mouse() {
        let opts = SessionOptions::default();
        assert!(opts.alternate_screen);
        assert!(opts.mouse);
        assert!(opts.title.is_none());
    }

    #[test]
    fn mouse_disable_also_clears_direct_mode() {
        let off = std::str::from_utf8(MOUSE_DISABLE).unwrap();
        for mode in ["1002", "1003", "1015", "1006"] {
            assert!(off.contains(&format!("?{mode}l")));
        }
    }

    #[test]
    fn sigwinch_is_forwarded() {
        let pending = PendingSignals::new();
        let queue = EventQueue::new();
        let guard = SignalGuard::new(pending.clone(), queue.clone()).unwrap();
        signal_hook::low_level::raise(SIGWINCH).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !pending.resize.get() {
            assert!(Instant::now() < deadline, "SIGWINCH not forwarded");
            queue.wait(Duration::from_millis(20));
        }
        assert!(!pending.quit.get());
        drop(guard);
    }
}
