#![forbid(unsafe_code)]

//! vitals: a live terminal dashboard of host metrics.
//!
//! The binary wires procfs [`sources`] into the [`app`] dashboard and hands
//! both to the runtime's tick orchestrator.

pub mod app;
pub mod cli;
pub mod logging;
pub mod sources;
