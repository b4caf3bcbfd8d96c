#![forbid(unsafe_code)]

//! Persisted user settings.
//!
//! Stored as pretty JSON at `$XDG_CONFIG_HOME/vitals/vitals.json`. Unknown
//! fields are ignored and missing ones take their defaults, so old files keep
//! loading. Every mutator marks the config dirty; [`Config::save_if_dirty`]
//! writes only then, through a temporary file and a rename.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::timer::{MAX_INTERVAL_MS, MIN_INTERVAL_MS, clamp_interval};

/// Step used by the interval keys.
pub const INTERVAL_STEP_MS: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub update_ms: u64,
    pub theme: String,
    /// strftime pattern; empty hides the clock.
    pub clock_format: String,
    pub mouse: bool,
    /// Keep sampling while an overlay is open.
    pub background_update: bool,
    pub log_level: String,
    #[serde(skip)]
    dirty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_ms: 2000,
            theme: "default".into(),
            clock_format: "%X".into(),
            mouse: true,
            background_update: true,
            log_level: "warn".into(),
            dirty: false,
        }
    }
}

impl Config {
    /// Read `path`. A missing file yields defaults; a corrupt one is an
    /// error the caller may choose to ignore.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let mut config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        config.update_ms = clamp_interval(config.update_ms);
        config.dirty = false;
        Ok(config)
    }

    /// [`load`](Self::load), falling back to defaults on any error.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable config");
            Self::default()
        })
    }

    /// Write the config unconditionally and clear the dirty flag.
    pub fn save(&mut self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = path.to_path_buf();
        tmp.set_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, self)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, path)?;
        self.dirty = false;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Save only when a mutator changed something. Returns whether it wrote.
    pub fn save_if_dirty(&mut self, path: &Path) -> Result<bool, ConfigError> {
        if !self.dirty {
            return Ok(false);
        }
        self.save(path)?;
        Ok(true)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_update_ms(&mut self, update_ms: u64) {
        let update_ms = clamp_interval(update_ms);
        if update_ms != self.update_ms {
            self.update_ms = update_ms;
            self.dirty = true;
        }
    }

    /// Shift the interval by `steps` of [`INTERVAL_STEP_MS`], within bounds.
    /// Returns the new interval.
    pub fn adjust_update_ms(&mut self, steps: i64) -> u64 {
        let target = (self.update_ms as i64).saturating_add(steps.saturating_mul(INTERVAL_STEP_MS));
        let target = target.clamp(MIN_INTERVAL_MS as i64, MAX_INTERVAL_MS as i64) as u64;
        self.set_update_ms(target);
        self.update_ms
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        let theme = theme.into();
        if theme != self.theme {
            self.theme = theme;
            self.dirty = true;
        }
    }

    pub fn set_clock_format(&mut self, format: impl Into<String>) {
        let format = format.into();
        if format != self.clock_format {
            self.clock_format = format;
            self.dirty = true;
        }
    }

    pub fn set_mouse(&mut self, mouse: bool) {
        if mouse != self.mouse {
            self.mouse = mouse;
            self.dirty = true;
        }
    }

    pub fn set_background_update(&mut self, background_update: bool) {
        if background_update != self.background_update {
            self.background_update = background_update;
            self.dirty = true;
        }
    }
}

/// `$XDG_CONFIG_HOME/vitals/vitals.json`, else `~/.config/vitals/vitals.json`,
/// else `./.vitals/vitals.json`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join("vitals").join("vitals.json");
    }
    if let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        return PathBuf::from(home)
            .join(".config")
            .join("vitals")
            .join("vitals.json");
    }
    PathBuf::from(".vitals").join("vitals.json")
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(_) => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}
