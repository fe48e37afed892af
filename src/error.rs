//! Unified error type for the benchmark harness
//!
//! A failed measurement is worse than none, so payload syscall failures are
//! surfaced as hard errors. The one exception is `EINTR`: the harness pokes
//! blocked threads with SIGINT on shutdown, so an interrupted system call is
//! the benign stop path and gets its own variant.

use std::io;
use thiserror::Error;

/// Errors produced by the harness and the benchmark payloads.
#[derive(Error, Debug)]
pub enum BenchError {
    /// A system call returned with `EINTR`. Benign: the harness interrupts
    /// blocked threads on purpose when a measurement window ends.
    #[error("system call interrupted by signal")]
    Interrupted,

    /// A system call inside a payload or the harness failed.
    #[error("{call} failed: {source}")]
    Sys {
        call: &'static str,
        source: io::Error,
    },

    /// The CPU topology could not be read or is unusable.
    #[error("cpu topology: {0}")]
    Topology(String),

    /// Histogram construction rejected the configured value range.
    #[error("histogram: {0}")]
    Histogram(String),

    /// Thread binding or signal installation failed.
    #[error("scheduling: {0}")]
    Sched(#[from] nix::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BenchError {
    /// Capture `errno` for a failed system call. `EINTR` is folded into
    /// [`BenchError::Interrupted`] so payloads can bubble it with `?`.
    pub fn last_sys(call: &'static str) -> BenchError {
        let source = io::Error::last_os_error();
        if source.raw_os_error() == Some(libc::EINTR) {
            BenchError::Interrupted
        } else {
            BenchError::Sys { call, source }
        }
    }

    /// True for the benign stop path.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, BenchError::Interrupted)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_sys_maps_eintr_to_interrupted() {
        unsafe {
            *libc::__errno_location() = libc::EINTR;
        }
        let err = BenchError::last_sys("read");
        assert!(err.is_interrupted());
    }

    #[test]
    fn test_last_sys_keeps_other_errno() {
        unsafe {
            *libc::__errno_location() = libc::ENOENT;
        }
        let err = BenchError::last_sys("open");
        assert!(!err.is_interrupted());
        assert_eq!(
            err.to_string(),
            format!("open failed: {}", io::Error::from_raw_os_error(libc::ENOENT))
        );
    }
}
