#![forbid(unsafe_code)]

//! Classification of one raw read into a key, a mouse report, or nothing.
//!
//! The reader hands over complete reads: a single byte, a UTF-8 character, or
//! an escape byte followed by whatever continuation arrived with it (up to 20
//! bytes). Only the leading sequence of a read is classified; trailing bytes
//! of a coalesced read are ignored, and unknown sequences are dropped.
//!
//! # Escape table
//!
//! | Suffix | Key | Suffix | Key |
//! |--------|-----|--------|-----|
//! | `[A` `OA` | Up | `[2~` | Insert |
//! | `[B` `OB` | Down | `[3~` | Delete |
//! | `[C` `OC` | Right | `[H` `[1~` | Home |
//! | `[D` `OD` | Left | `[F` `[4~` | End |
//! | `[5~` | PageUp | `[6~` | PageDown |
//! | `[Z` | BackTab | `OP`..`OS` | F1..F4 |
//! | `[15` `[17` `[18` `[19` | F5..F8 | `[20` `[21` `[23` `[24` | F9..F12 |
//!
//! Mouse reports use SGR encoding: `ESC [ < button ; col ; row (M|m)`.

use crate::event::Key;

/// The escape byte.
pub const ESC: u8 = 0x1b;

/// SGR mouse report prefix (after `ESC`).
const MOUSE_PREFIX: &[u8] = b"[<";

/// Button code reported for pointer motion with no button held.
pub const MOUSE_MOTION: u16 = 35;
pub const MOUSE_LEFT: u16 = 0;
pub const MOUSE_SCROLL_UP: u16 = 64;
pub const MOUSE_SCROLL_DOWN: u16 = 65;

const ESCAPE_TABLE: &[(&[u8], Key)] = &[
    (b"[A", Key::Up),
    (b"OA", Key::Up),
    (b"[B", Key::Down),
    (b"OB", Key::Down),
    (b"[D", Key::Left),
    (b"OD", Key::Left),
    (b"[C", Key::Right),
    (b"OC", Key::Right),
    (b"[2~", Key::Insert),
    (b"[3~", Key::Delete),
    (b"[H", Key::Home),
    (b"[1~", Key::Home),
    (b"[F", Key::End),
    (b"[4~", Key::End),
    (b"[5~", Key::PageUp),
    (b"[6~", Key::PageDown),
    (b"[Z", Key::BackTab),
    (b"OP", Key::F(1)),
    (b"OQ", Key::F(2)),
    (b"OR", Key::F(3)),
    (b"OS", Key::F(4)),
    (b"[15", Key::F(5)),
    (b"[17", Key::F(6)),
    (b"[18", Key::F(7)),
    (b"[19", Key::F(8)),
    (b"[20", Key::F(9)),
    (b"[21", Key::F(10)),
    (b"[23", Key::F(11)),
    (b"[24", Key::F(12)),
];

/// A decoded SGR mouse report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseReport {
    pub button: u16,
    /// Column, 1-indexed.
    pub x: u16,
    /// Row, 1-indexed.
    pub y: u16,
    /// `true` for the `m` terminator.
    pub release: bool,
}

/// Result of classifying one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
    Key(Key),
    Mouse(MouseReport),
    /// Pointer motion report; sets the mouse-moved signal, never queued.
    Motion,
    Unrecognized,
}

/// Classify the bytes of one read.
#[must_use]
pub fn classify(seq: &[u8]) -> Parsed {
    match seq {
        [] => Parsed::Unrecognized,
        [ESC] => Parsed::Key(Key::Escape),
        [ESC, ..] => classify_escape(seq),
        [byte] => classify_byte(*byte),
        _ => classify_utf8(seq),
    }
}

fn classify_byte(byte: u8) -> Parsed {
    let key = match byte {
        b'\n' | b'\r' => Key::Enter,
        0x7f | 0x08 => Key::Backspace,
        b'\t' => Key::Tab,
        0x01..=0x1a => Key::Ctrl(char::from(b'a' + byte - 1)),
        0x00 | 0x1c..=0x1f => return Parsed::Unrecognized,
        0x20..=0x7e => Key::Char(char::from(byte)),
        _ => return Parsed::Unrecognized,
    };
    Parsed::Key(key)
}

fn classify_utf8(seq: &[u8]) -> Parsed {
    let Ok(text) = std::str::from_utf8(seq) else {
        return Parsed::Unrecognized;
    };
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Parsed::Key(Key::Char(c)),
        _ => Parsed::Unrecognized,
    }
}

fn classify_escape(seq: &[u8]) -> Parsed {
    let start = seq.iter().position(|&b| b != ESC).unwrap_or(seq.len());
    let body = &seq[start..];
    if body.is_empty() {
        return Parsed::Key(Key::Escape);
    }
    if let Some(params) = body.strip_prefix(MOUSE_PREFIX) {
        return parse_mouse(params);
    }
    ESCAPE_TABLE
        .iter()
        .find(|(suffix, _)| body.starts_with(suffix))
        .map_or(Parsed::Unrecognized, |(_, key)| Parsed::Key(*key))
}

fn parse_mouse(params: &[u8]) -> Parsed {
    let Some(end) = params.iter().position(|&b| b == b'M' || b == b'm') else {
        return Parsed::Unrecognized;
    };
    let release = params[end] == b'm';
    let Ok(text) = std::str::from_utf8(&params[..end]) else {
        return Parsed::Unrecognized;
    };
    let mut fields = text.split(';').map(str::parse::<u16>);
    let (Some(Ok(button)), Some(Ok(x)), Some(Ok(y)), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Parsed::Unrecognized;
    };
    if button == MOUSE_MOTION {
        return Parsed::Motion;
    }
    Parsed::Mouse(MouseReport {
        button,
        x,
        y,
        release,
    })
}

/// Expected length of a UTF-8 sequence from its lead byte (1 for ASCII and
/// invalid leads).
#[must_use]
pub fn utf8_len(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

/// Whether `seq` starts an SGR mouse report.
#[must_use]
pub fn is_mouse_prefix(seq: &[u8]) -> bool {
    let start = seq.iter().position(|&b| b != ESC).unwrap_or(seq.len());
    start > 0 && seq[start..].starts_with(MOUSE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seq: &[u8]) -> Key {
        match classify(seq) {
            Parsed::Key(k) => k,
            other => panic!("expected key for {seq:?}, got {other:?}"),
        }
    }

    #[test]
    fn literal_keys() {
        assert_eq!(key(b"a"), Key::Char('a'));
        assert_eq!(key(b"+"), Key::Char('+'));
        assert_eq!(key(b"\\"), Key::Char('\\'));
        assert_eq!(key(b"\r"), Key::Enter);
        assert_eq!(key(b"\n"), Key::Enter);
        assert_eq!(key(b"\x7f"), Key::Backspace);
        assert_eq!(key(b"\x08"), Key::Backspace);
        assert_eq!(key(b"\t"), Key::Tab);
    }

    #[test]
    fn control_bytes() {
        assert_eq!(key(b"\x03"), Key::Ctrl('c'));
        assert_eq!(key(b"\x1a"), Key::Ctrl('z'));
        assert_eq!(classify(b"\x00"), Parsed::Unrecognized);
    }

    #[test]
    fn utf8_character() {
        assert_eq!(key("é".as_bytes()), Key::Char('é'));
        assert_eq!(key("日".as_bytes()), Key::Char('日'));
        assert_eq!(classify(&[0xe6, 0x97]), Parsed::Unrecognized);
    }

    #[test]
    fn lone_escape() {
        assert_eq!(key(b"\x1b"), Key::Escape);
        assert_eq!(key(b"\x1b\x1b"), Key::Escape);
    }

    #[test]
    fn arrows_both_encodings() {
        assert_eq!(key(b"\x1b[A"), Key::Up);
        assert_eq!(key(b"\x1bOA"), Key::Up);
        assert_eq!(key(b"\x1b[B"), Key::Down);
        assert_eq!(key(b"\x1b[C"), Key::Right);
        assert_eq!(key(b"\x1bOD"), Key::Left);
    }

    #[test]
    fn editing_and_paging() {
        assert_eq!(key(b"\x1b[2~"), Key::Insert);
        assert_eq!(key(b"\x1b[3~"), Key::Delete);
        assert_eq!(key(b"\x1b[H"), Key::Home);
        assert_eq!(key(b"\x1b[1~"), Key::Home);
        assert_eq!(key(b"\x1b[F"), Key::End);
        assert_eq!(key(b"\x1b[4~"), Key::End);
        assert_eq!(key(b"\x1b[5~"), Key::PageUp);
        assert_eq!(key(b"\x1b[6~"), Key::PageDown);
        assert_eq!(key(b"\x1b[Z"), Key::BackTab);
    }

    #[test]
    fn function_keys() {
        assert_eq!(key(b"\x1bOP"), Key::F(1));
        assert_eq!(key(b"\x1bOS"), Key::F(4));
        assert_eq!(key(b"\x1b[15~"), Key::F(5));
        assert_eq!(key(b"\x1b[19~"), Key::F(8));
        assert_eq!(key(b"\x1b[20~"), Key::F(9));
        assert_eq!(key(b"\x1b[24~"), Key::F(12));
    }

    #[test]
    fn coalesced_read_uses_leading_sequence() {
        assert_eq!(key(b"\x1b[A\x1b[B"), Key::Up);
    }

    #[test]
    fn unknown_escape_dropped() {
        assert_eq!(classify(b"\x1b[99x"), Parsed::Unrecognized);
        assert_eq!(classify(b"\x1bq"), Parsed::Unrecognized);
    }

    #[test]
    fn mouse_release_and_press() {
        assert_eq!(
            classify(b"\x1b[<0;12;5m"),
            Parsed::Mouse(MouseReport {
                button: 0,
                x: 12,
                y: 5,
                release: true
            })
        );
        assert_eq!(
            classify(b"\x1b[<0;12;5M"),
            Parsed::Mouse(MouseReport {
                button: 0,
                x: 12,
                y: 5,
                release: false
            })
        );
    }

    #[test]
    fn mouse_scroll_and_motion() {
        assert!(matches!(
            classify(b"\x1b[<64;1;1M"),
            Parsed::Mouse(MouseReport { button: 64, .. })
        ));
        assert!(matches!(
            classify(b"\x1b[<65;1;1M"),
            Parsed::Mouse(MouseReport { button: 65, .. })
        ));
        assert_eq!(classify(b"\x1b[<35;40;10M"), Parsed::Motion);
    }

    #[test]
    fn truncated_mouse_report_dropped() {
        assert_eq!(classify(b"\x1b[<0;12"), Parsed::Unrecognized);
        assert_eq!(classify(b"\x1b[<0;x;5m"), Parsed::Unrecognized);
        assert_eq!(classify(b"\x1b[<0;1;2;3m"), Parsed::Unrecognized);
    }

    #[test]
    fn mouse_prefix_detection() {
        assert!(is_mouse_prefix(b"\x1b[<0;1;1M"));
        assert!(!is_mouse_prefix(b"\x1b[A"));
        assert!(!is_mouse_prefix(b"[<0;1;1M"));
    }

    #[test]
    fn utf8_lengths() {
        assert_eq!(utf8_len(b'a'), 1);
        assert_eq!(utf8_len(0xc3), 2);
        assert_eq!(utf8_len(0xe6), 3);
        assert_eq!(utf8_len(0xf0), 4);
    }
}
