//! Property-based invariant tests for input classification and queuing.
//!
//! 1. The classifier never panics on arbitrary bytes.
//! 2. Any single printable ASCII byte classifies as that character.
//! 3. The event queue never holds more than its capacity and keeps the
//!    most recent events in order.
//! 4. Well-formed SGR release reports round-trip their coordinates.

use proptest::prelude::*;
use vitals_core::input_parser::{MouseReport, Parsed, classify};
use vitals_core::{EVENT_QUEUE_CAPACITY, EventQueue, InputEvent, Key};

// ═════════════════════════════════════════════════════════════════════════
// 1. No panics
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn classify_total(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = classify(&bytes);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Printable ASCII
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn printable_ascii_is_literal(byte in 0x20u8..=0x7e) {
        prop_assert_eq!(classify(&[byte]), Parsed::Key(Key::Char(char::from(byte))));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Queue bound
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn queue_keeps_most_recent(chars in proptest::collection::vec(proptest::char::range('a', 'z'), 0..40)) {
        let queue = EventQueue::new();
        for &c in &chars {
            queue.push(InputEvent::Key(Key::Char(c)));
            prop_assert!(queue.len() <= EVENT_QUEUE_CAPACITY);
        }
        let kept = queue.drain();
        let skip = chars.len().saturating_sub(EVENT_QUEUE_CAPACITY);
        let expected: Vec<InputEvent> = chars[skip..]
            .iter()
            .map(|&c| InputEvent::Key(Key::Char(c)))
            .collect();
        prop_assert_eq!(kept, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Mouse coordinates
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn release_report_coordinates(x in 1u16..=1000, y in 1u16..=1000) {
        let seq = format!("\x1b[<0;{x};{y}m");
        prop_assert_eq!(
            classify(seq.as_bytes()),
            Parsed::Mouse(MouseReport { button: 0, x, y, release: true })
        );
    }
}
