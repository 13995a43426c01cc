//! Logging setup for the executables
//!
//! Records go to two sinks: a coloured stdout stream capped at `DEBUG`, and the session log file
//! which gets everything down to `min_level` without colour codes. Each record is stamped with the
//! seconds elapsed since the session started.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt::Arguments;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `trace` records (per tick sensor and estimator values) only reach the log file.
///
/// # Notes
///
/// - `min_level` must be at least `LevelFilter::Info` so that mode changes of the control loop
///   are always recorded.
/// - Only the first call in a process can succeed.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let stdout = fern::Dispatch::new()
        .level(std::cmp::min(min_level, LevelFilter::Debug))
        .format(|out, message, record| {
            let level = colour_level(record.level());
            out.finish(format_args!("{}", format_record(level, record, message)))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            let level = short_level(record.level());
            out.finish(format_args!("{}", format_record(level, record, message)))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .level_for("regex", LevelFilter::Info)
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the line for one record. The target is only shown below `INFO`.
fn format_record<L: std::fmt::Display>(
    level: L,
    record: &Record,
    message: &Arguments
) -> String {
    let elapsed = session::get_elapsed_seconds();

    if record.level() > Level::Info {
        format!("[{:10.6} {}] {}: {}", elapsed, level, record.target(), message)
    }
    else {
        format!("[{:10.6} {}] {}", elapsed, level, message)
    }
}

fn short_level(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info  => "INF",
        Level::Warn  => "WRN",
        Level::Error => "ERR"
    }
}

fn colour_level(level: Level) -> ColoredString {
    let s = short_level(level);
    match level {
        Level::Trace => s.dimmed().italic(),
        Level::Debug => s.dimmed(),
        Level::Info  => s.normal(),
        Level::Warn  => s.yellow(),
        Level::Error => s.red().bold()
    }
}
