//! An interrupted cycle leaves published output untouched.
//!
//! The source below walks a long list of entities and polls the interrupt
//! flag between items, the way a process-list sampler does. The test
//! interrupts it mid-walk and checks that neither the compositor buffer nor
//! the device saw anything from the abandoned cycle.

use std::io::{self, Write};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use vitals_core::{AbortSignal, EventQueue, Flag, IoGate};
use vitals_render::Compositor;
use vitals_runtime::{
    Collector, CycleOutcome, CycleRequest, DataSource, RenderContext, SourceError,
};

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
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

/// Sums a list; the second and later samples stall until interrupted.
struct Walker {
    generation: u32,
    total: u64,
    started: mpsc::Sender<()>,
}

impl DataSource for Walker {
    fn name(&self) -> &str {
        "walker"
    }

    fn buffers(&self) -> &[&'static str] {
        &["walker"]
    }

    fn sample(&mut self, interrupt: &Flag) -> Result<(), SourceError> {
        self.generation += 1;
        let stall = self.generation > 1;
        let mut total = 0u64;
        if stall {
            let _ = self.started.send(());
        }
        for item in 0u64.. {
            if interrupt.get() {
                return Err(SourceError::Interrupted);
            }
            total += item;
            if !stall && item == 1000 {
                break;
            }
            if stall {
                thread::sleep(Duration::from_millis(1));
            }
        }
        self.total = total;
        Ok(())
    }

    fn render(&mut self, ctx: &RenderContext<'_>) -> io::Result<()> {
        ctx.write(
            "walker",
            &format!("\x1b[2;2fgen {} total {}", self.generation, self.total),
        )
    }
}

fn setup() -> (Collector, Arc<Compositor>, Capture, mpsc::Receiver<()>) {
    let capture = Capture::default();
    let compositor = Arc::new(Compositor::new(
        Box::new(capture.clone()),
        Arc::new(IoGate::new()),
    ));
    let mut collector = Collector::new(
        Arc::clone(&compositor),
        Flag::new(),
        AbortSignal::new(EventQueue::new()),
    );
    let (tx, rx) = mpsc::channel();
    collector.register(Box::new(Walker {
        generation: 0,
        total: 0,
        started: tx,
    }));
    collector.start().unwrap();
    (collector, compositor, capture, rx)
}

#[test]
fn interrupted_sample_keeps_previous_frame() {
    let (collector, compositor, capture, started) = setup();

    collector.enqueue(CycleRequest::full());
    assert!(collector.wait_idle(Duration::from_secs(5)));
    let live_before = compositor.live("walker").unwrap();
    let snapshot_before = compositor.snapshot();
    let device_before = capture.bytes();
    assert_eq!(live_before, "\x1b[2;2fgen 1 total 500500");

    collector.enqueue(CycleRequest::full());
    started.recv_timeout(Duration::from_secs(5)).unwrap();
    collector.interrupt();
    assert!(collector.wait_idle(Duration::from_secs(5)));

    assert_eq!(collector.last_outcome(), Some(CycleOutcome::Interrupted));
    assert_eq!(compositor.live("walker").unwrap(), live_before);
    assert_eq!(compositor.snapshot(), snapshot_before);
    assert_eq!(capture.bytes(), device_before);
}

#[test]
fn interrupting_request_replaces_the_stale_cycle() {
    let (collector, compositor, capture, started) = setup();

    collector.enqueue(CycleRequest::full());
    assert!(collector.wait_idle(Duration::from_secs(5)));
    let frames_before = capture.bytes().len();

    collector.enqueue(CycleRequest::full());
    started.recv_timeout(Duration::from_secs(5)).unwrap();
    // Blocks until the stale cycle has aborted, then installs a redraw.
    collector.enqueue(CycleRequest::redraw_only().interrupting());
    assert!(collector.wait_idle(Duration::from_secs(5)));

    assert_eq!(collector.last_outcome(), Some(CycleOutcome::Flushed));
    assert_eq!(collector.cycles(), 3);
    // The redraw shows the values of the last completed sample.
    let redrawn = String::from_utf8(capture.bytes()[frames_before..].to_vec()).unwrap();
    assert_eq!(redrawn, "\x1b[2;2fgen 2 total 500500");
    assert_eq!(compositor.live("walker").unwrap(), redrawn);
}
