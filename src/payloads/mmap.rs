//! Anonymous-mapping payloads: mmap/munmap cycles and the bare map call
//!
//! The cycle payloads are symmetric and stateless, so they are plain
//! [`Symmetric`] closures. `MmapOnly` times just the `mmap(2)` call and
//! unmaps outside the measured span, which needs a custom
//! `measured_operation`.

use std::ptr;

use crate::action::{Action, Symmetric};
use crate::clock;
use crate::error::{BenchError, Result};

const PLAIN_LEN: usize = 1024 * 1024;
const POPULATE_LEN: usize = 2 * 1024 * 1024;

pub(crate) fn map_anon(
    len: usize,
    prot: libc::c_int,
    extra_flags: libc::c_int,
) -> Result<*mut libc::c_void> {
    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            prot,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | extra_flags,
            -1,
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(BenchError::last_sys("mmap"));
    }
    Ok(addr)
}

pub(crate) fn unmap(addr: *mut libc::c_void, len: usize) -> Result<()> {
    if unsafe { libc::munmap(addr, len) } < 0 {
        return Err(BenchError::last_sys("munmap"));
    }
    Ok(())
}

/// Full `mmap` + `munmap` cycle of a 1 MiB anonymous private region.
pub fn map_unmap() -> impl Action<State = ()> {
    Symmetric::new("mmap-munmap", || {
        let addr = map_anon(PLAIN_LEN, libc::PROT_READ | libc::PROT_WRITE, 0)?;
        unmap(addr, PLAIN_LEN)
    })
}

/// 2 MiB cycle with `MAP_POPULATE`, so the fault-in cost is included.
pub fn map_populate_unmap() -> impl Action<State = ()> {
    Symmetric::new("mmap-populate-munmap", || {
        let addr = map_anon(
            POPULATE_LEN,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_POPULATE,
        )?;
        unmap(addr, POPULATE_LEN)
    })
}

/// Times only the `mmap(2)` call of a 2 MiB region; the unmap happens
/// outside the clock bracket.
pub struct MmapOnly {
    len: usize,
}

impl MmapOnly {
    pub fn new() -> MmapOnly {
        MmapOnly { len: POPULATE_LEN }
    }
}

impl Default for MmapOnly {
    fn default() -> Self {
        MmapOnly::new()
    }
}

impl Action for MmapOnly {
    type State = ();

    fn name(&self) -> &'static str {
        "mmap"
    }

    fn make_state(&self, _threads: &crate::action::InterferingThreads) -> Result<()> {
        Ok(())
    }

    fn raw_operation(&self, _state: &mut ()) -> Result<()> {
        let addr = map_anon(self.len, libc::PROT_READ | libc::PROT_WRITE, 0)?;
        unmap(addr, self.len)
    }

    fn measured_operation(&self, _state: &mut ()) -> Result<u64> {
        let start = clock::monotonic_ns();
        let addr = map_anon(self.len, libc::PROT_READ | libc::PROT_WRITE, 0)?;
        let end = clock::monotonic_ns();
        unmap(addr, self.len)?;
        Ok(end.saturating_sub(start))
    }
}
