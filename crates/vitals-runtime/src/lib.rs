#![forbid(unsafe_code)]

//! Runtime: the sampler scheduler, the tick orchestrator and persisted settings.

pub mod collector;
pub mod config;
pub mod program;
pub mod source;
pub mod timer;

pub use collector::{Collector, CycleOutcome, CycleRequest, Phase};
pub use config::{Config, ConfigError, default_config_path};
pub use program::{Dashboard, Flow, Program, ProgramConfig, ProgramError, TickContext};
pub use source::{Area, DataSource, RenderContext, SourceError, SourceId};
pub use timer::Timer;
