//! Logging for templopt.
//!
//! `log` facade with an `env_logger` backend. Our own records follow the
//! `--quiet`/`-v`/`-vv` flags; dependencies (walkdir, ignore, globset) stay
//! at warn so a trace run is not flooded by matcher internals. `RUST_LOG`,
//! when set, replaces both filters.
//!
//! ```rust,no_run
//! use templopt::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("scanning templates");
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    /// `quiet` wins over any number of `-v`.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Error,
            Self::Normal => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }

    /// Level applied to records from other crates.
    fn dependency_level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::Error,
            _ => LevelFilter::Warn,
        }
    }

    /// Whether lines carry a timestamp and the emitting module.
    fn detailed(self) -> bool {
        matches!(self, Self::Debug | Self::Trace)
    }
}

/// Initialize logging from the CLI verbosity flags.
///
/// A second call is a no-op.
pub fn init_logging(verbose: u8, quiet: bool) {
    let verbosity = Verbosity::from_flags(verbose, quiet);
    let from_env = std::env::var_os("RUST_LOG").is_some();

    let mut builder = Builder::new();
    if from_env {
        builder.parse_env(Env::default());
    } else {
        builder
            .filter_level(verbosity.dependency_level())
            .filter_module(CRATE_TARGET, verbosity.level());
    }

    let detailed = verbosity.detailed();
    builder.format(move |buf, record| {
        let style = buf.default_level_style(record.level());
        if detailed {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.module_path().unwrap_or(record.target()),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", record.level(), record.args())
        }
    });

    if builder.try_init().is_ok() && !from_env {
        log::debug!("Logging at {:?}", verbosity);
    }
}

/// Lowercase name of the active maximum log level.
#[must_use]
pub fn current_level_name() -> String {
    log::max_level().to_string().to_lowercase()
}
