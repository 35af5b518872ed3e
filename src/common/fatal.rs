//! The unrecoverable error tier
//!
//! The substrate is invariant-asserting rather than defensively
//! validating: loader-mode misuse, arity and allocation ceilings, and
//! detected table corruption have no retry path. Such conditions are
//! reported as a [`Fatal`] value carrying the failed condition and its
//! source location. Only a top-level embedder converts a `Fatal` into
//! a process exit; everything below it just propagates with `?`.
//!
//! Ordinary "not found" outcomes are plain result values and never
//! travel this path.

use std::process;

use thiserror::Error;

/// An unrecoverable condition: diagnostic context for an invariant
/// that failed. There is no unwind-and-retry for these.
#[derive(Debug, Error)]
#[error("fatal: {condition} ({file}:{line})")]
pub struct Fatal {
    condition: String,
    file: &'static str,
    line: u32,
}

impl Fatal {
    pub fn new(condition: String, file: &'static str, line: u32) -> Self {
        Fatal {
            condition,
            file,
            line,
        }
    }

    /// The failed condition text.
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Flush diagnostics and abort the process.
    ///
    /// For use by the top-level entry point only; library code
    /// propagates `Fatal` values instead.
    pub fn exit(self) -> ! {
        tracing::error!(
            condition = %self.condition,
            file = self.file,
            line = self.line,
            "unrecoverable condition"
        );
        eprintln!("{}", self);
        process::abort()
    }
}

/// Build a [`Fatal`] capturing the current source location.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {
        $crate::common::fatal::Fatal::new(format!($($arg)*), file!(), line!())
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn fatal_carries_condition_and_location() {
        let f = fatal!("bucket#{} corrupted", 3);
        assert_eq!(f.condition(), "bucket#3 corrupted");
        assert!(f.to_string().contains("fatal.rs"));
    }
}
