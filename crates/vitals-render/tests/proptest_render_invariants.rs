//! Property-based invariant tests for the render primitives.
//!
//! 1. Graph rows stay exactly `width` cells after any push sequence.
//! 2. Graph pushes never panic on out-of-range samples.
//! 3. Meter fill is monotone in the percent.
//! 4. Meter output always holds `width` cells.
//! 5. Compositor frames concatenate buffers by descending z.
//! 6. Once buffers appear in exactly one flush.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use vitals_core::IoGate;
use vitals_render::glyphs::METER;
use vitals_render::{Compositor, Gradient, Graph, GraphOptions, Meter, Rgb, WriteOptions};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<String>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn compositor() -> (Compositor, Capture) {
    let cap = Capture::default();
    (
        Compositor::new(Box::new(cap.clone()), Arc::new(IoGate::new())),
        cap,
    )
}

fn palette() -> Vec<String> {
    vec![Rgb::new(0, 200, 0).fg(), Rgb::new(200, 0, 0).fg()]
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Graph geometry
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn graph_rows_keep_width(
        width in 1u16..=40,
        height in 1u16..=6,
        seed in prop::collection::vec(-50i64..=250, 0..100),
        pushes in prop::collection::vec(-50i64..=250, 0..100),
        inverted in any::<bool>(),
    ) {
        let options = if inverted { GraphOptions::default().inverted() } else { GraphOptions::default() };
        let mut graph = Graph::new(width, height, palette(), &seed, options);
        for v in pushes {
            graph.push(Some(v));
            let lengths = graph.row_lengths();
            prop_assert_eq!(lengths.len(), usize::from(height));
            for len in lengths {
                prop_assert_eq!(len, usize::from(width));
            }
            prop_assert!((0..=100).contains(&graph.last()));
        }
    }

    #[test]
    fn graph_scaled_samples_stay_in_range(
        max in 1i64..=10_000,
        offset in 0i64..=100,
        values in prop::collection::vec(any::<i32>(), 1..50),
    ) {
        let mut graph = Graph::new(10, 2, palette(), &[], GraphOptions::default().with_max(max, offset));
        for v in values {
            graph.push(Some(i64::from(v)));
            prop_assert!((0..=100).contains(&graph.last()));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3-4. Meter
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn meter_fill_is_monotone(width in 1u16..=60, a in 0i64..=100, b in 0i64..=100) {
        let gradient = Gradient::new(Rgb::new(10, 10, 10), None, Some(Rgb::new(250, 250, 250)));
        let meter = Meter::new(width, gradient, None, false);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(meter.filled_columns(lo) <= meter.filled_columns(hi));
        prop_assert_eq!(meter.filled_columns(100), width);
    }

    #[test]
    fn meter_output_has_width_cells(width in 1u16..=60, p in -20i64..=120, invert in any::<bool>()) {
        let gradient = Gradient::new(Rgb::new(10, 10, 10), Some(Rgb::new(90, 90, 0)), Some(Rgb::new(250, 250, 250)));
        let mut meter = Meter::new(width, gradient, Some(Rgb::gray(0x30)), invert);
        prop_assert_eq!(meter.render(p).matches(METER).count(), usize::from(width));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. Compositor
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn frame_is_sorted_by_descending_z(zs in prop::collection::vec(-5i32..=5, 1..12)) {
        let (comp, cap) = compositor();
        for (i, z) in zs.iter().enumerate() {
            comp.write(&format!("b{i}"), &format!("<{i}>"), WriteOptions::new().z(*z)).unwrap();
        }
        comp.flush_all().unwrap();

        let mut expected: Vec<(i32, usize)> = zs.iter().copied().zip(0..).collect();
        expected.sort_by_key(|&(z, i)| (std::cmp::Reverse(z), i));
        let expected: String = expected.iter().map(|(_, i)| format!("<{i}>")).collect();
        let frames = cap.0.lock().unwrap().clone();
        prop_assert_eq!(frames, vec![expected]);
    }

    #[test]
    fn once_buffers_flush_once(once in prop::collection::vec(any::<bool>(), 1..10)) {
        let (comp, cap) = compositor();
        for (i, is_once) in once.iter().enumerate() {
            let opts = if *is_once { WriteOptions::new().once() } else { WriteOptions::new() };
            comp.write(&format!("b{i}"), &format!("<{i}>"), opts).unwrap();
        }
        comp.flush_all().unwrap();
        comp.flush_all().unwrap();

        let frames = cap.0.lock().unwrap().clone();
        for (i, is_once) in once.iter().enumerate() {
            let tag = format!("<{i}>");
            let seen = frames.iter().filter(|f| f.contains(&tag)).count();
            prop_assert_eq!(seen, if *is_once { 1 } else { 2 });
            prop_assert_eq!(comp.contains(&format!("b{i}")), !*is_once);
        }
    }
}
