#![forbid(unsafe_code)]

//! Classified input events.
//!
//! The reader turns raw terminal bytes into these values. Mouse coordinates
//! are 1-indexed, exactly as the terminal reports them, so they can be
//! compared directly against positions written with `ESC[line;colf`.

use std::fmt;

/// A logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character (or any single character without a name).
    Char(char),
    /// A control byte, stored as its lowercase letter (`0x03` is `Ctrl('c')`).
    Ctrl(char),
    Enter,
    Backspace,
    Tab,
    BackTab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key `F1`..=`F12`.
    F(u8),
}

impl Key {
    /// Stable lowercase name, e.g. `"page_up"` or `"f5"`.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Ctrl(c) => format!("ctrl_{c}"),
            Self::Enter => "enter".into(),
            Self::Backspace => "backspace".into(),
            Self::Tab => "tab".into(),
            Self::BackTab => "shift_tab".into(),
            Self::Escape => "escape".into(),
            Self::Up => "up".into(),
            Self::Down => "down".into(),
            Self::Left => "left".into(),
            Self::Right => "right".into(),
            Self::Insert => "insert".into(),
            Self::Delete => "delete".into(),
            Self::Home => "home".into(),
            Self::End => "end".into(),
            Self::PageUp => "page_up".into(),
            Self::PageDown => "page_down".into(),
            Self::F(n) => format!("f{n}"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// What a mouse report resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    /// Left-button release that did not land on a registered region.
    Click,
    /// Left-button release inside a region registered in the hit map.
    Region(Key),
    ScrollUp,
    ScrollDown,
}

/// An event delivered through the [`EventQueue`](crate::event_queue::EventQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    Mouse { action: MouseAction, x: u16, y: u16 },
    /// Synthetic entry used to wake a waiting consumer; carries no input.
    Wake,
}

impl InputEvent {
    /// The key this event stands for, treating region clicks as key presses.
    #[must_use]
    pub fn as_key(&self) -> Option<Key> {
        match self {
            Self::Key(key) => Some(*key),
            Self::Mouse {
                action: MouseAction::Region(key),
                ..
            } => Some(*key),
            _ => None,
        }
    }
}
