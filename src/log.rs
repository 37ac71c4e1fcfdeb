//! Process-wide log gate.
//!
//! The library logs through `tracing`, but emission is additionally gated by
//! a single global level so embedders without a subscriber-level filter can
//! silence it with one call. Set once at program start; mutated rarely.

use std::sync::atomic::{AtomicU8, Ordering};

/// Library log level. Each level is a superset of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// No output at all.
    None = 0,
    /// Errors only.
    Error = 1,
    /// Errors and warnings.
    Warning = 2,
    /// Informational messages.
    Info = 3,
    /// Per-frame diagnostics (dropped frames, pool churn).
    Verbose = 4,
}

static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warning as u8);

/// Set the global log level.
pub fn set_log_level(level: LogLevel) {
    LEVEL.store(level as u8, Ordering::Relaxed);
}

/// The current global log level.
#[must_use]
pub fn log_level() -> LogLevel {
    match LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::None,
        1 => LogLevel::Error,
        2 => LogLevel::Warning,
        3 => LogLevel::Info,
        _ => LogLevel::Verbose,
    }
}

pub(crate) fn enabled(level: LogLevel) -> bool {
    level as u8 <= LEVEL.load(Ordering::Relaxed)
}

macro_rules! log_error {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Error) {
            tracing::error!($($arg)*);
        }
    };
}

macro_rules! log_warn {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Warning) {
            tracing::warn!($($arg)*);
        }
    };
}

macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Info) {
            tracing::info!($($arg)*);
        }
    };
}

macro_rules! log_verbose {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Verbose) {
            tracing::debug!($($arg)*);
        }
    };
}

pub(crate) use {log_error, log_info, log_verbose, log_warn};

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn levels_are_supersets() {
        set_log_level(LogLevel::Info);
        assert!(enabled(LogLevel::Error));
        assert!(enabled(LogLevel::Warning));
        assert!(enabled(LogLevel::Info));
        assert!(!enabled(LogLevel::Verbose));

        set_log_level(LogLevel::None);
        assert!(!enabled(LogLevel::Error));

        set_log_level(LogLevel::Warning);
        assert_eq!(log_level(), LogLevel::Warning);
    }
}
