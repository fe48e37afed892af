//! Fault-delivery latency payload
//!
//! Unlike the other pagefault payloads, which clock-bracket a map or a
//! first touch, this one times the kernel's fault-handling path itself.
//! The payload keeps a single `PROT_NONE` page and reads it with a pinned
//! load instruction, so every operation takes a SIGSEGV. The handler
//! records the timestamp from signal context and advances the program
//! counter past the faulting load; the sample is that timestamp minus the
//! start taken just before the read.
//!
//! The program-counter fixup must skip exactly one instruction, so the
//! load is written in inline assembly with a pinned register and a known
//! encoding length per architecture.

use std::cell::Cell;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::action::{Action, InterferingThreads};
use crate::clock;
use crate::error::Result;
use crate::payloads::mmap::{map_anon, unmap};

const PAGE_LEN: usize = 4096;

thread_local! {
    /// Timestamp recorded by the SIGSEGV handler on this thread.
    static FAULT_END_NS: Cell<u64> = const { Cell::new(0) };
}

extern "C" fn on_segv(_signum: libc::c_int, _info: *mut libc::siginfo_t, ctx: *mut libc::c_void) {
    // clock_gettime is async-signal-safe; a failed read would leave the
    // previous timestamp in place, and the sample clamp catches that.
    let mut ts = unsafe { std::mem::zeroed::<libc::timespec>() };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    FAULT_END_NS.set((ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64));

    let ctx = ctx as *mut libc::ucontext_t;
    unsafe {
        #[cfg(target_arch = "x86_64")]
        {
            // Jump over the 3-byte "mov rax, [rax]" in faulting_read.
            (*ctx).uc_mcontext.gregs[libc::REG_RIP as usize] += 3;
        }
        #[cfg(target_arch = "aarch64")]
        {
            // Jump over the 4-byte "ldr x0, [x0]" in faulting_read.
            (*ctx).uc_mcontext.pc += 4;
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn faulting_read(addr: usize) {
    unsafe {
        std::arch::asm!("mov rax, [rax]", inout("rax") addr => _, options(nostack, readonly));
    }
}

#[cfg(target_arch = "aarch64")]
fn faulting_read(addr: usize) {
    unsafe {
        std::arch::asm!("ldr x0, [x0]", inout("x0") addr => _, options(nostack, readonly));
    }
}

pub struct PagefaultSignal {
    page: usize,
}

impl PagefaultSignal {
    pub fn new() -> Result<PagefaultSignal> {
        Ok(PagefaultSignal {
            page: map_anon(PAGE_LEN, libc::PROT_NONE, 0)? as usize,
        })
    }
}

impl Drop for PagefaultSignal {
    fn drop(&mut self) {
        let _ = unmap(self.page as *mut libc::c_void, PAGE_LEN);
    }
}

impl Action for PagefaultSignal {
    type State = ();

    fn name(&self) -> &'static str {
        "pagefault-signal"
    }

    fn make_state(&self, _threads: &InterferingThreads) -> Result<()> {
        let handler = SigAction::new(
            SigHandler::SigAction(on_segv),
            SaFlags::SA_SIGINFO,
            SigSet::empty(),
        );
        unsafe { sigaction(Signal::SIGSEGV, &handler) }?;
        Ok(())
    }

    fn raw_operation(&self, _state: &mut ()) -> Result<()> {
        faulting_read(self.page);
        Ok(())
    }

    fn measured_operation(&self, _state: &mut ()) -> Result<u64> {
        let start = clock::monotonic_ns();
        faulting_read(self.page);
        Ok(FAULT_END_NS.get().saturating_sub(start))
    }
}
