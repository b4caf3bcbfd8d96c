//! Compositor writes never overlap an escape-sequence read.
//!
//! A real input reader consumes a stream of escape sequences from a socket
//! pair while another thread flushes frames as fast as it can. The output
//! device records every write that lands while the reader holds its read
//! section.

#![cfg(unix)]

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vitals_core::{
    AbortSignal, EventQueue, Flag, InputReader, IoGate, MouseHitMap, ReaderContext,
};
use vitals_render::{Compositor, WriteOptions};

struct GateCheckingWriter {
    gate: Arc<IoGate>,
    writes: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
}

impl Write for GateCheckingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.gate.is_reader_busy() {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn reader_over_socket(gate: Arc<IoGate>) -> (InputReader, UnixStream, EventQueue) {
    let (a, b) = UnixStream::pair().unwrap();
    let tty: File = std::os::fd::OwnedFd::from(a).into();
    let queue = EventQueue::new();
    let ctx = ReaderContext {
        queue: queue.clone(),
        hit_map: MouseHitMap::new(),
        gate,
        modal: Flag::new(),
        abort: AbortSignal::new(queue.clone()),
    };
    (InputReader::spawn(tty, ctx).unwrap(), b, queue)
}

#[test]
fn flushes_never_overlap_reads() {
    let gate = Arc::new(IoGate::new());
    let writes = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let comp = Arc::new(Compositor::new(
        Box::new(GateCheckingWriter {
            gate: Arc::clone(&gate),
            writes: Arc::clone(&writes),
            overlaps: Arc::clone(&overlaps),
        }),
        Arc::clone(&gate),
    ));
    let (mut reader, mut feed, queue) = reader_over_socket(Arc::clone(&gate));

    let stop = Flag::new();
    let flusher = {
        let comp = Arc::clone(&comp);
        let stop = stop.clone();
        thread::spawn(move || {
            let mut n = 0u64;
            while !stop.get() {
                comp.write("frame", &format!("frame {n}"), WriteOptions::new().now())
                    .unwrap();
                n += 1;
            }
        })
    };

    for _ in 0..200 {
        feed.write_all(b"\x1b[A\x1b[<0;5;5M\x1bOP").unwrap();
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(100));
    stop.set();
    flusher.join().unwrap();
    reader.stop();

    assert!(writes.load(Ordering::SeqCst) > 0);
    assert!(!queue.is_empty());
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn flush_waits_for_an_active_read() {
    let gate = Arc::new(IoGate::new());
    let writes = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let comp = Arc::new(Compositor::new(
        Box::new(GateCheckingWriter {
            gate: Arc::clone(&gate),
            writes: Arc::clone(&writes),
            overlaps: Arc::clone(&overlaps),
        }),
        Arc::clone(&gate),
    ));

    let read = gate.begin_read();
    let writer = {
        let comp = Arc::clone(&comp);
        thread::spawn(move || comp.write("x", "x", WriteOptions::new().now()).unwrap())
    };
    thread::sleep(Duration::from_millis(50));
    assert_eq!(writes.load(Ordering::SeqCst), 0);
    drop(read);
    writer.join().unwrap();
    assert_eq!(writes.load(Ordering::SeqCst), 1);
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}
