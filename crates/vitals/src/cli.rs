#![forbid(unsafe_code)]

//! Command-line argument parsing.
//!
//! Arguments are parsed by hand; a value follows its flag either after `=`
//! or as the next argument. `VITALS_*` environment variables supply defaults
//! that explicit flags override. Both override the config file for the
//! current run only and are never saved back.

use std::env;
use std::path::PathBuf;
use std::process;

use vitals_runtime::Config;
use vitals_runtime::timer::clamp_interval;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP_TEXT: &str = "\
vitals - live terminal dashboard of host metrics

USAGE:
    vitals [OPTIONS]

OPTIONS:
    --update-ms N        Sample interval in milliseconds (100..=86399900)
    --theme NAME         Color theme: 'default' or 'mono'
    --config PATH        Settings file (default: $XDG_CONFIG_HOME/vitals/vitals.json)
    --no-mouse           Disable mouse reporting
    --debug              Log at debug level
    --help, -h           Show this help message
    --version, -V        Show version

KEYBINDINGS:
    + / -                Lengthen / shorten the sample interval
    h / F1               Toggle help overlay
    Esc                  Close overlay
    Ctrl+Z               Suspend to the shell
    q / Ctrl+C           Quit

ENVIRONMENT VARIABLES:
    VITALS_UPDATE_MS     Override --update-ms
    VITALS_THEME         Override --theme
    VITALS_NO_MOUSE      Disable the mouse when set to 1 or true
    VITALS_LOG           Log filter directives (e.g. 'vitals_runtime=trace')";

/// Parsed command-line options. `None` leaves the config value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Opts {
    pub update_ms: Option<u64>,
    pub theme: Option<String>,
    pub mouse: Option<bool>,
    pub config: Option<PathBuf>,
    pub debug: bool,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse the process arguments and environment, exiting on `--help`,
    /// `--version` or bad input.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match parse_from(&args, |key| env::var(key).ok()) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("vitals {VERSION}");
                process::exit(0);
            }
            Err(msg) => {
                eprintln!("{msg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    /// Apply the overrides to `config` without marking it dirty.
    pub fn apply(&self, config: &mut Config) {
        if let Some(update_ms) = self.update_ms {
            config.update_ms = clamp_interval(update_ms);
        }
        if let Some(theme) = &self.theme {
            config.theme.clone_from(theme);
        }
        if let Some(mouse) = self.mouse {
            config.mouse = mouse;
        }
    }
}

/// Parse `args` (without the program name) with `var` as the environment.
pub fn parse_from<S, F>(args: &[S], var: F) -> Result<Command, String>
where
    S: AsRef<str>,
    F: Fn(&str) -> Option<String>,
{
    let mut opts = Opts::default();

    if let Some(val) = var("VITALS_UPDATE_MS")
        && let Ok(n) = val.trim().parse()
    {
        opts.update_ms = Some(n);
    }
    if let Some(val) = var("VITALS_THEME").filter(|v| !v.is_empty()) {
        opts.theme = Some(val);
    }
    if let Some(val) = var("VITALS_NO_MOUSE")
        && matches!(val.trim(), "1" | "true" | "yes")
    {
        opts.mouse = Some(false);
    }

    let mut args = args.iter().map(as_str);
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
            _ => (arg, None),
        };
        match flag {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--no-mouse" => opts.mouse = Some(false),
            "--debug" => opts.debug = true,
            "--update-ms" | "--theme" | "--config" => {
                let value = inline
                    .or_else(|| args.next())
                    .ok_or_else(|| format!("Missing value for {flag}"))?;
                match flag {
                    "--update-ms" => {
                        let n = value
                            .parse()
                            .map_err(|_| format!("Invalid --update-ms value: {value}"))?;
                        opts.update_ms = Some(n);
                    }
                    "--theme" => opts.theme = Some(value.to_string()),
                    _ => {
                        if value.is_empty() {
                            return Err("Empty --config path".into());
                        }
                        opts.config = Some(PathBuf::from(value));
                    }
                }
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    Ok(Command::Run(opts))
}

fn as_str<S: AsRef<str>>(s: &S) -> &str {
    s.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn run(args: &[&str]) -> Opts {
        match parse_from(args, no_env).unwrap() {
            Command::Run(opts) => opts,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn defaults_leave_config_alone() {
        assert_eq!(run(&[]), Opts::default());
    }

    #[test]
    fn flags() {
        let opts = run(&["--update-ms=500", "--no-mouse", "--debug", "--theme=mono"]);
        assert_eq!(opts.update_ms, Some(500));
        assert_eq!(opts.mouse, Some(false));
        assert!(opts.debug);
        assert_eq!(opts.theme.as_deref(), Some("mono"));
    }

    #[test]
    fn separate_values() {
        let opts = run(&["--update-ms", "750", "--config", "v.json"]);
        assert_eq!(opts.update_ms, Some(750));
        assert_eq!(opts.config, Some(PathBuf::from("v.json")));
        let err = parse_from(&["--theme"], no_env).unwrap_err();
        assert!(err.contains("Missing value"));
    }

    #[test]
    fn config_path() {
        let opts = run(&["--config=/tmp/v.json"]);
        assert_eq!(opts.config, Some(PathBuf::from("/tmp/v.json")));
        assert!(parse_from(&["--config="], no_env).is_err());
    }

    #[test]
    fn help_and_version_short_circuit() {
        assert_eq!(parse_from(&["-h", "--bogus"], no_env), Ok(Command::Help));
        assert_eq!(parse_from(&["--version"], no_env), Ok(Command::Version));
    }

    #[test]
    fn bad_input_is_reported() {
        let err = parse_from(&["--update-ms=fast"], no_env).unwrap_err();
        assert!(err.contains("fast"));
        let err = parse_from(&["--wat"], no_env).unwrap_err();
        assert!(err.contains("--wat"));
    }

    #[test]
    fn env_defaults_and_flag_override() {
        let env = |key: &str| match key {
            "VITALS_UPDATE_MS" => Some("750".to_string()),
            "VITALS_NO_MOUSE" => Some("1".to_string()),
            _ => None,
        };
        let Command::Run(opts) = parse_from::<&str, _>(&[], env).unwrap() else {
            panic!("expected run");
        };
        assert_eq!(opts.update_ms, Some(750));
        assert_eq!(opts.mouse, Some(false));

        let Command::Run(opts) = parse_from(&["--update-ms=300"], env).unwrap() else {
            panic!("expected run");
        };
        assert_eq!(opts.update_ms, Some(300));
    }

    #[test]
    fn overrides_are_not_persisted() {
        let mut config = Config::default();
        run(&["--update-ms=5", "--theme=mono", "--no-mouse"]).apply(&mut config);
        assert_eq!(config.update_ms, 100);
        assert_eq!(config.theme, "mono");
        assert!(!config.mouse);
        assert!(!config.is_dirty());

        let mut untouched = Config::default();
        run(&[]).apply(&mut untouched);
        assert_eq!(untouched, Config::default());
    }

    #[test]
    fn help_lists_every_flag() {
        for flag in ["--update-ms", "--theme", "--config", "--no-mouse", "--debug"] {
            assert!(HELP_TEXT.contains(flag), "missing {flag}");
        }
    }
}
