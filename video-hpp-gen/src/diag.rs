//! Diagnostics for registry authoring errors.
//!
//! Hard errors abort the run through `anyhow` and carry the XML line they
//! were found on. Soft warnings are logged and collected so the caller can
//! inspect them after the run.

use std::fmt;

use tracing::warn;

/// Bail out of the current function with a line-tagged registry error unless
/// `cond` holds.
///
/// ```ignore
/// check!(types.contains(name), line, "unknown required type <{name}>");
/// ```
macro_rules! check {
    ($cond:expr, $line:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::diag::spec_error($line, format_args!($($arg)+)));
        }
    };
}

pub(crate) use check;

/// A line-tagged registry error, for sites that build the error themselves
/// (`ok_or_else`, `map_err`).
pub fn spec_error(line: usize, message: impl fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("spec error on line {line}: {message}")
}

/// A non-fatal finding about the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spec warning on line {}: {}", self.line, self.message)
    }
}

/// Record a warning unless `cond` holds.
pub fn warn_unless(cond: bool, line: usize, message: impl Into<String>, sink: &mut Vec<Warning>) {
    if !cond {
        let warning = Warning {
            line,
            message: message.into(),
        };
        warn!(line, message = %warning.message, "spec warning");
        sink.push(warning);
    }
}
