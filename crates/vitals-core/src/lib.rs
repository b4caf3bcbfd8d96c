#![forbid(unsafe_code)]

//! Core: input events, the raw-mode input reader, and terminal lifecycle.

pub mod event;
pub mod event_queue;
pub mod hit_map;
pub mod input_parser;
#[cfg(unix)]
pub mod input_reader;
pub mod io_gate;
pub mod signal;
#[cfg(unix)]
pub mod terminal_session;

pub use event::{InputEvent, Key, MouseAction};
pub use event_queue::{EVENT_QUEUE_CAPACITY, EventQueue};
pub use hit_map::MouseHitMap;
#[cfg(unix)]
pub use input_reader::{InputReader, ReaderContext};
pub use io_gate::IoGate;
pub use signal::{AbortSignal, Flag, ThreadFailure};
