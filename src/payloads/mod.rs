//! Built-in benchmark payloads
//!
//! Each payload implements [`crate::action::Action`] (or uses one of the
//! symmetric adapters) around a single OS primitive. The payloads mirror
//! the binaries under `src/bin/`; the harness itself knows nothing about
//! them.

pub mod calls;
pub mod eventfd;
pub mod locks;
pub mod mmap;
pub mod mprotect;
pub mod open;
pub mod pagefault;
// The signal-context program-counter fixup is per-architecture.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
pub mod pagefault_signal;
pub mod pthread_kill;
pub mod thread_create;

use crate::error::{BenchError, Result};

/// Force a read from `addr` even if the result is unused. The pagefault
/// payloads use this to make the first touch of a fresh mapping observable.
pub(crate) fn force_read<T: Copy>(addr: *const T) -> T {
    unsafe { std::ptr::read_volatile(addr) }
}

/// Map the return convention of `pthread_*` calls, which hand back the error
/// number directly instead of setting `errno`.
pub(crate) fn check_pthread(call: &'static str, rc: libc::c_int) -> Result<()> {
    if rc == 0 {
        Ok(())
    } else if rc == libc::EINTR {
        Err(BenchError::Interrupted)
    } else {
        Err(BenchError::Sys {
            call,
            source: std::io::Error::from_raw_os_error(rc),
        })
    }
}
