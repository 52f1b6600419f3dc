//! A minimal, dependency-free logging facade for the region pool crate.
//!
//! The pool and radix tree are meant to sit underneath allocation-sensitive
//! code (request-scoped arenas, routing tables), so pulling in a full logging
//! framework just to report a handful of diagnostic events (a chunk grow, a
//! large-allocation reuse, a cleanup handler that failed) is more dependency
//! than the job needs. This crate is the whole thing: a severity level, a
//! single global filter, and a handful of macros that format straight to
//! stderr.
//!
//! # Examples
//!
//! ```
//! use region_log::{set_level, Level};
//!
//! set_level(Level::Debug);
//! region_log::debug!("pool grew by one chunk");
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

/// Severity of a logged event, ordered from most to least severe so that
/// `enabled(level)` is a single integer comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global severity filter. Events at or below the current level are emitted;
/// everything more verbose is dropped before formatting runs.
struct Filter {
    level: AtomicU8,
}

static FILTER: OnceLock<Filter> = OnceLock::new();

fn filter() -> &'static Filter {
    FILTER.get_or_init(|| Filter {
        level: AtomicU8::new(Level::Info as u8),
    })
}

/// Sets the global severity filter. Events more verbose than `level` are
/// skipped without formatting their arguments.
pub fn set_level(level: Level) {
    filter().level.store(level as u8, Ordering::Relaxed);
}

/// Returns the current global severity filter.
#[must_use]
pub fn level() -> Level {
    Level::from_u8(filter().level.load(Ordering::Relaxed))
}

/// Returns whether an event at `level` would currently be emitted.
#[must_use]
pub fn enabled(level: Level) -> bool {
    level <= self::level()
}

#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    eprintln!("[{level}] {target}: {args}");
}

#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)+) => {{
        $crate::__emit($level, module_path!(), format_args!($($arg)+));
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Error, $($arg)+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::log!($crate::Level::Trace, $($arg)+) };
}
