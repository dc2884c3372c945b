//! Logging setup for apod-cache.
//!
//! Uses the `log` facade with the `env_logger` backend. The level comes from
//! (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (errors only) or `-v` / `-vv`
//! 3. Default: info
//!
//! Outside of `RUST_LOG`, the chosen level applies to this crate only;
//! HTTP and TLS dependencies stay at `warn` unless tracing with `-vv`.
//!
//! # Example
//!
//! ```rust,no_run
//! use apod_cache::logging::init_logging;
//!
//! init_logging(1, false); // debug output for apod-cache
//! log::debug!("cache opened");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logging subsystem. Call once, before any logging.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=info, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by RUST_LOG)
///
/// # Panics
///
/// Panics if called more than once, as `env_logger` can only be
/// initialized once per process.
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();

    let from_env = env::var("RUST_LOG").is_ok();
    if from_env {
        builder.parse_default_env();
    } else {
        let level = determine_level(verbose, quiet);
        builder
            .filter_level(dependency_level(level))
            .filter_module(env!("CARGO_CRATE_NAME"), level);
    }

    configure_format(&mut builder, verbose);
    builder.init();

    if from_env {
        log::debug!("Logging configured from RUST_LOG");
    } else {
        log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        );
    }
}

/// Map CLI flags to this crate's log level.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Level for everything that is not this crate.
fn dependency_level(level: LevelFilter) -> LevelFilter {
    match level {
        LevelFilter::Trace => LevelFilter::Debug,
        LevelFilter::Off | LevelFilter::Error => LevelFilter::Error,
        _ => LevelFilter::Warn,
    }
}

/// Debug builds get timestamps and, when verbose, module paths. Release
/// builds print level and message only.
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}
