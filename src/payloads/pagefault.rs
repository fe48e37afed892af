//! Page-fault payloads
//!
//! The walking payloads touch an anonymous region one page per operation,
//! so every operation takes exactly one minor fault; the region is the
//! per-thread state and is remapped fresh once exhausted so a wall-clock
//! driven window keeps faulting. The large variant uses 1 GiB of
//! `MAP_HUGETLB` memory in 2 MiB steps and needs a configured hugepage
//! pool. `PagefaultSmall` maps a fresh 4 KiB region per operation and
//! times only the first-touch read.

use crate::action::{Action, SymmetricWithState};
use crate::clock;
use crate::error::Result;
use crate::payloads::force_read;
use crate::payloads::mmap::{map_anon, unmap};

const SMALL_PAGE: usize = 4096;
const LARGE_PAGE: usize = 2 * 1024 * 1024;

/// Per-thread fault arena: the current mapping, the next untouched page,
/// and what it takes to map a replacement.
pub struct FaultArena {
    addr: usize,
    len: usize,
    step: usize,
    extra_flags: libc::c_int,
    no_hugepages: bool,
    offset: usize,
}

impl FaultArena {
    fn map(len: usize, step: usize, extra_flags: libc::c_int, no_hugepages: bool) -> Result<FaultArena> {
        Ok(FaultArena {
            addr: Self::map_region(len, extra_flags, no_hugepages)?,
            len,
            step,
            extra_flags,
            no_hugepages,
            offset: 0,
        })
    }

    fn map_region(len: usize, extra_flags: libc::c_int, no_hugepages: bool) -> Result<usize> {
        let addr = map_anon(len, libc::PROT_READ | libc::PROT_WRITE, extra_flags)?;
        if no_hugepages {
            // Failure here would silently merge touches into one fault.
            if unsafe { libc::madvise(addr, len, libc::MADV_NOHUGEPAGE) } < 0 {
                let err = crate::error::BenchError::last_sys("madvise");
                let _ = unmap(addr, len);
                return Err(err);
            }
        }
        Ok(addr as usize)
    }

    fn touch(&mut self) -> Result<()> {
        if self.offset >= self.len {
            // Exhausted: swap in a fresh mapping so the next touch faults.
            let fresh = Self::map_region(self.len, self.extra_flags, self.no_hugepages)?;
            let _ = unmap(self.addr as *mut libc::c_void, self.len);
            self.addr = fresh;
            self.offset = 0;
        }
        unsafe {
            std::ptr::write_volatile((self.addr + self.offset) as *mut u8, 0);
        }
        self.offset += self.step;
        Ok(())
    }
}

impl Drop for FaultArena {
    fn drop(&mut self) {
        let _ = unmap(self.addr as *mut libc::c_void, self.len);
    }
}

/// 1 MiB region, 4 KiB pages, transparent hugepages disabled so every
/// touch is a real small-page fault.
pub fn small_pages() -> impl Action<State = FaultArena> {
    SymmetricWithState::new(
        "pagefault",
        || FaultArena::map(1024 * 1024, SMALL_PAGE, 0, true),
        FaultArena::touch,
    )
}

/// 1 GiB of explicit hugetlb memory, one 2 MiB fault per operation.
pub fn huge_pages() -> impl Action<State = FaultArena> {
    SymmetricWithState::new(
        "pagefault-large",
        || FaultArena::map(1024 * 1024 * 1024, LARGE_PAGE, libc::MAP_HUGETLB, false),
        FaultArena::touch,
    )
}

/// Fresh 4 KiB mapping per operation; only the first-touch read is timed.
pub struct PagefaultSmall;

const SMALL_REGION: usize = 4 * 1024;

impl Action for PagefaultSmall {
    type State = ();

    fn name(&self) -> &'static str {
        "pagefault-small"
    }

    fn make_state(&self, _threads: &crate::action::InterferingThreads) -> Result<()> {
        Ok(())
    }

    fn raw_operation(&self, _state: &mut ()) -> Result<()> {
        let addr = map_anon(SMALL_REGION, libc::PROT_READ | libc::PROT_WRITE, 0)?;
        force_read(addr as *const u64);
        unmap(addr, SMALL_REGION)
    }

    fn measured_operation(&self, _state: &mut ()) -> Result<u64> {
        let addr = map_anon(SMALL_REGION, libc::PROT_READ | libc::PROT_WRITE, 0)?;
        let start = clock::monotonic_ns();
        force_read(addr as *const u64);
        let end = clock::monotonic_ns();
        unmap(addr, SMALL_REGION)?;
        Ok(end.saturating_sub(start))
    }
}
