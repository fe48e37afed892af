//! `mprotect(2)` payload
//!
//! Flips a shared 1 MiB anonymous region to `PROT_NONE` and back. The
//! region is owned by the closure and shared by every thread of the run,
//! so interfering threads contend on the same VMA the way the measuring
//! thread does.

use crate::action::{Action, Symmetric};
use crate::error::{BenchError, Result};
use crate::payloads::mmap::{map_anon, unmap};

const REGION_LEN: usize = 1024 * 1024;

struct Region(*mut libc::c_void);

// The region's address is stable for the lifetime of the payload and all
// access goes through mprotect, which the kernel serialises.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    fn map() -> Result<Region> {
        Ok(Region(map_anon(
            REGION_LEN,
            libc::PROT_READ | libc::PROT_WRITE,
            0,
        )?))
    }

    fn set_protection(&self, prot: libc::c_int) -> Result<()> {
        if unsafe { libc::mprotect(self.0, REGION_LEN, prot) } < 0 {
            return Err(BenchError::last_sys("mprotect"));
        }
        Ok(())
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        let _ = unmap(self.0, REGION_LEN);
    }
}

/// `PROT_NONE` and back again on the shared region.
pub fn toggle() -> Result<impl Action<State = ()>> {
    let region = Region::map()?;
    Ok(Symmetric::new("mprotect", move || {
        region.set_protection(libc::PROT_NONE)?;
        region.set_protection(libc::PROT_READ | libc::PROT_WRITE)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::InterferingThreads;

    #[test]
    fn test_protection_roundtrip() {
        let action = toggle().unwrap();
        let mut state = action.make_state(&InterferingThreads::default()).unwrap();
        action.raw_operation(&mut state).unwrap();
        assert!(action.measured_operation(&mut state).unwrap() > 0);
    }
}
