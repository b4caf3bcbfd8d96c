#![forbid(unsafe_code)]

//! vitals binary entry point.

use std::env;
use std::path::Path;
use std::process;

use vitals::cli;
use vitals::logging;
use vitals_runtime::{Config, default_config_path};

fn main() {
    let opts = cli::Opts::parse();
    let config_path = opts.config.clone().unwrap_or_else(default_config_path);
    let loaded = Config::load(&config_path);
    let mut stored = loaded.as_ref().cloned().unwrap_or_default();

    let log_path = logging::default_log_path();
    let directives = logging::filter_directives(
        opts.debug,
        env::var("VITALS_LOG").ok().as_deref(),
        &stored.log_level,
    );
    if let Err(e) = logging::init(&log_path, &directives) {
        eprintln!("vitals: cannot open log file {}: {e}", log_path.display());
    }
    if let Err(e) = &loaded {
        tracing::warn!(error = %e, "ignoring unreadable config");
    }

    let mut effective = stored.clone();
    opts.apply(&mut effective);
    tracing::info!(
        version = cli::VERSION,
        config = %config_path.display(),
        update_ms = effective.update_ms,
        "starting"
    );

    match run(effective) {
        Ok(last) => {
            if last.is_dirty() {
                stored.set_update_ms(last.update_ms);
                save(&mut stored, &config_path);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "exiting on error");
            eprintln!("vitals: {e}");
            eprintln!("see {} for details", log_path.display());
            process::exit(1);
        }
    }
}

fn save(config: &mut Config, path: &Path) {
    if let Err(e) = config.save_if_dirty(path) {
        tracing::warn!(error = %e, "could not save config");
        eprintln!("vitals: could not save {}: {e}", path.display());
    }
}

/// Run the dashboard until quit. Returns the settings as the user left them.
#[cfg(unix)]
fn run(config: Config) -> Result<Config, vitals_runtime::ProgramError> {
    use vitals::app::App;
    use vitals::sources::{Clock, CpuSource, LoadSource, MemSource};
    use vitals_runtime::{Program, ProgramConfig};

    let cores = std::thread::available_parallelism().map_or(1, |n| n.get() as u32);
    let app = App::new(config.clone());
    let theme = app.theme().clone();
    let program_config = ProgramConfig {
        interval_ms: config.update_ms,
        mouse: config.mouse,
        ..ProgramConfig::default()
    };

    let mut program = Program::new(app, program_config)?;
    program.register(Box::new(CpuSource::new(&theme)));
    program.register(Box::new(MemSource::new(&theme)));
    program.register(Box::new(LoadSource::new(&theme, cores)));
    program.register(Box::new(Clock::new(&theme, &config.clock_format)));
    program.run()?;
    Ok(program.dashboard().config().clone())
}

#[cfg(not(unix))]
fn run(_config: Config) -> Result<Config, vitals_runtime::ProgramError> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "a Unix terminal is required").into())
}
