//! The dashboard driven headless over fake procfs files.

use std::fs;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use vitals::app::{App, MIN_COLS};
use vitals::sources::{CpuSource, LoadSource, MemSource};
use vitals_core::{InputEvent, Key, MouseAction};
use vitals_runtime::{Config, Dashboard, Program, ProgramConfig};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn reset(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Fixture {
    _dir: TempDir,
    program: Program<App>,
    capture: Capture,
}

fn key(c: char) -> InputEvent {
    InputEvent::Key(Key::Char(c))
}

fn fixture(size: (u16, u16), interval_ms: u64) -> Fixture {
    fixture_with(size, interval_ms, Config::default())
}

fn fixture_with(size: (u16, u16), interval_ms: u64, mut config: Config) -> Fixture {
    let dir = TempDir::new().unwrap();
    let stat = dir.path().join("stat");
    let meminfo = dir.path().join("meminfo");
    let loadavg = dir.path().join("loadavg");
    fs::write(&stat, "cpu  100 0 100 800 0 0 0 0 0 0\n").unwrap();
    fs::write(
        &meminfo,
        "MemTotal: 8000000 kB\nMemAvailable: 6000000 kB\nCached: 1000000 kB\n",
    )
    .unwrap();
    fs::write(&loadavg, "0.50 0.40 0.30 1/100 999\n").unwrap();

    config.update_ms = interval_ms;
    let app = App::new(config);
    let theme = app.theme().clone();
    let capture = Capture::default();
    let program = Program::headless(
        app,
        ProgramConfig {
            interval_ms,
            mouse: false,
            title: None,
            resize_poll: Duration::from_millis(5),
            resize_settle: Duration::from_millis(20),
        },
        Box::new(capture.clone()),
        size,
    );
    program.register(Box::new(CpuSource::new(&theme).with_stat_path(&stat)));
    program.register(Box::new(MemSource::new(&theme).with_meminfo_path(&meminfo)));
    program.register(Box::new(LoadSource::new(&theme, 4).with_loadavg_path(&loadavg)));
    Fixture {
        _dir: dir,
        program,
        capture,
    }
}

#[test]
fn first_cycle_draws_every_pane() {
    let mut f = fixture((100, 30), 100);
    f.program.start().unwrap();
    assert!(f.capture.text().contains("cpu"));
    assert!(f.capture.text().contains("100ms"));

    f.program.tick().unwrap();
    assert!(f.program.collector().wait_idle(Duration::from_secs(2)));
    let text = f.capture.text();
    assert!(text.contains("CPU "));
    assert!(text.contains("Used"));
    assert!(text.contains("0.50 0.40 0.30 (4 cores)"));
    f.program.shutdown();
}

#[test]
fn indicator_is_clickable() {
    let mut f = fixture((100, 30), 2000);
    f.program.start().unwrap();
    assert_eq!(f.program.hit_map().lookup(85, 13), Some(Key::Char('-')));
    assert_eq!(f.program.hit_map().lookup(98, 13), Some(Key::Char('+')));
    assert_eq!(f.program.hit_map().lookup(86, 13), None);
    f.program.shutdown();
}

#[test]
fn plus_key_lengthens_interval() {
    let mut f = fixture((100, 30), 2000);
    f.program.start().unwrap();
    f.program.tick().unwrap();
    f.capture.reset();

    f.program.queue().push(InputEvent::Mouse {
        action: MouseAction::Region(Key::Char('+')),
        x: 98,
        y: 13,
    });
    f.program.queue().push(key('+'));
    f.program.queue().push(key('q'));
    f.program.tick().unwrap();

    assert!(!f.program.is_running());
    assert_eq!(f.program.timer().interval_ms(), 2200);
    let config = f.program.dashboard().config();
    assert_eq!(config.update_ms, 2200);
    assert!(config.is_dirty());
    assert!(f.capture.text().contains("2200ms"));
    f.program.shutdown();
}

#[test]
fn help_overlay_opens_and_closes() {
    let mut f = fixture((100, 30), 100);
    f.program.start().unwrap();
    f.program.tick().unwrap();
    assert!(f.program.collector().wait_idle(Duration::from_secs(2)));

    f.capture.reset();
    f.program.queue().push(key('h'));
    f.program.tick().unwrap();
    assert!(f.program.dashboard().help_open());
    assert!(f.program.modal().get());
    assert!(f.capture.text().contains("esc to close"));
    assert!(f.program.dashboard().should_collect());

    assert!(f.program.collector().wait_idle(Duration::from_secs(2)));
    f.capture.reset();
    f.program.queue().push(InputEvent::Mouse {
        action: MouseAction::Click,
        x: 1,
        y: 1,
    });
    f.program.tick().unwrap();
    assert!(!f.program.dashboard().help_open());
    assert!(!f.program.modal().get());
    assert!(f.capture.text().contains("CPU "));
    f.program.shutdown();
}

#[test]
fn help_pauses_sampling_without_background_update() {
    let mut config = Config::default();
    config.background_update = false;
    let mut f = fixture_with((100, 30), 2000, config);
    f.program.start().unwrap();
    assert!(f.program.dashboard().should_collect());
    f.program.tick().unwrap();
    f.program.queue().push(key('h'));
    f.program.queue().push(key('q'));
    f.program.tick().unwrap();
    assert!(f.program.dashboard().help_open());
    assert!(!f.program.dashboard().should_collect());
    f.program.shutdown();
}

#[test]
fn small_terminal_shows_warning() {
    let mut f = fixture((MIN_COLS - 20, 20), 100);
    f.program.start().unwrap();
    assert!(f.program.dashboard().too_small());
    assert!(!f.program.dashboard().should_collect());
    assert!(f.capture.text().contains("Terminal size too small"));

    f.program.queue().push(key('h'));
    f.program.queue().push(key('q'));
    while f.program.is_running() {
        f.program.tick().unwrap();
    }
    assert!(!f.program.dashboard().help_open());
    assert!(f.program.hit_map().is_empty());
    f.program.shutdown();
}

#[test]
fn growing_terminal_restores_layout() {
    let mut f = fixture((60, 20), 100);
    f.program.start().unwrap();
    assert!(f.program.dashboard().too_small());

    f.program.set_size((100, 30));
    f.program.signals().resize.set();
    f.program.tick().unwrap();
    assert!(!f.program.dashboard().too_small());
    let panes = f.program.dashboard().panes().unwrap();
    assert_eq!(panes.cpu_box.width, 100);
    assert!(f.program.collector().wait_idle(Duration::from_secs(2)));
    assert!(f.capture.text().contains("CPU "));
    f.program.shutdown();
}
