#![forbid(unsafe_code)]

//! File logging.
//!
//! The dashboard owns the terminal, so log lines go to
//! `$XDG_STATE_HOME/vitals/vitals.log`. The file is rotated at start-up once
//! it passes [`MAX_LOG_BYTES`], keeping [`KEEP_ROTATED`] old generations.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const MAX_LOG_BYTES: u64 = 1024 * 1024;
pub const KEEP_ROTATED: usize = 4;

/// `$XDG_STATE_HOME/vitals/vitals.log`, else `~/.local/state/vitals/vitals.log`,
/// else `./.vitals/vitals.log`.
#[must_use]
pub fn default_log_path() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_STATE_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join("vitals").join("vitals.log");
    }
    if let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("vitals")
            .join("vitals.log");
    }
    PathBuf::from(".vitals").join("vitals.log")
}

/// Filter directives in priority order: `--debug`, then `VITALS_LOG`, then
/// the configured level.
#[must_use]
pub fn filter_directives(debug: bool, env: Option<&str>, level: &str) -> String {
    if debug {
        return "debug".into();
    }
    if let Some(env) = env.map(str::trim).filter(|e| !e.is_empty()) {
        return env.to_string();
    }
    let level = level.trim();
    if level.is_empty() {
        "warn".into()
    } else {
        level.to_ascii_lowercase()
    }
}

/// Shift `path` to `path.1`, `path.1` to `path.2` and so on when it is larger
/// than `max_bytes`. The oldest generation past `keep` is removed. Returns
/// whether a rotation happened.
pub fn rotate(path: &Path, max_bytes: u64, keep: usize) -> io::Result<bool> {
    let len = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if len <= max_bytes || keep == 0 {
        return Ok(false);
    }
    let generation = |n: usize| {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    };
    match fs::remove_file(generation(keep)) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    for n in (1..keep).rev() {
        let from = generation(n);
        if from.exists() {
            fs::rename(&from, generation(n + 1))?;
        }
    }
    fs::rename(path, generation(1))?;
    Ok(true)
}

/// Install the global subscriber writing to `path`. Invalid directives fall
/// back to `warn`. A second call is a no-op.
pub fn init(path: &Path, directives: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate(path, MAX_LOG_BYTES, KEEP_ROTATED)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directive_priority() {
        assert_eq!(filter_directives(true, Some("trace"), "error"), "debug");
        assert_eq!(filter_directives(false, Some("vitals=trace"), "error"), "vitals=trace");
        assert_eq!(filter_directives(false, Some("  "), "INFO"), "info");
        assert_eq!(filter_directives(false, None, ""), "warn");
    }

    #[test]
    fn small_log_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vitals.log");
        fs::write(&path, b"short").unwrap();
        assert!(!rotate(&path, 1024, 4).unwrap());
        assert!(path.exists());
        assert!(!rotate(&dir.path().join("absent.log"), 1024, 4).unwrap());
    }

    #[test]
    fn rotation_shifts_generations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vitals.log");
        let gen_path = |n: usize| dir.path().join(format!("vitals.log.{n}"));
        fs::write(gen_path(1), b"one").unwrap();
        fs::write(gen_path(2), b"two").unwrap();
        fs::write(gen_path(3), b"three").unwrap();
        fs::write(gen_path(4), b"four").unwrap();
        fs::write(&path, vec![b'x'; 64]).unwrap();

        assert!(rotate(&path, 16, 4).unwrap());
        assert!(!path.exists());
        assert_eq!(fs::read(gen_path(1)).unwrap().len(), 64);
        assert_eq!(fs::read_to_string(gen_path(2)).unwrap(), "one");
        assert_eq!(fs::read_to_string(gen_path(4)).unwrap(), "three");
        assert!(!gen_path(5).exists());
    }

    #[test]
    fn init_creates_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("vitals.log");
        init(&path, "not a [valid filter").unwrap();
        assert!(path.exists());
    }
}
