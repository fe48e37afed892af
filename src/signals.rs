//! Process-wide signal flags and alarm control
//!
//! POSIX signal handlers may only touch `sig_atomic_t`-equivalent storage,
//! so the two flags the harness needs live here as module-scope atomics:
//! `SIGINT_FIRED` (user abort, and the poke used to unblock co-runners) and
//! `ALARM_FIRED` (end of a measurement window). Both are cleared at the
//! start of every window.
//!
//! Handlers are installed without `SA_RESTART`. This is load-bearing: the
//! harness relies on SIGINT interrupting blocking system calls inside
//! interfering threads so they can observe the stop flag.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::error::Result;

static SIGINT_FIRED: AtomicBool = AtomicBool::new(false);
static ALARM_FIRED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signum: libc::c_int) {
    SIGINT_FIRED.store(true, Ordering::Relaxed);
}

extern "C" fn on_sigalrm(_signum: libc::c_int) {
    ALARM_FIRED.store(true, Ordering::Relaxed);
}

extern "C" fn on_wakeup(_signum: libc::c_int) {
    // Nothing to do; the delivery itself unblocks the target thread.
}

/// Install the harness SIGINT and SIGALRM handlers. Call once, before any
/// measurement starts.
pub fn install() -> Result<()> {
    install_handler(Signal::SIGINT, SigHandler::Handler(on_sigint))?;
    install_handler(Signal::SIGALRM, SigHandler::Handler(on_sigalrm))?;
    Ok(())
}

/// Install a do-nothing, non-restarting handler for `signal`. Wakeup
/// payloads use this so a directed signal interrupts the target's blocking
/// call without any other effect.
pub fn install_wakeup_handler(signal: Signal) -> Result<()> {
    install_handler(signal, SigHandler::Handler(on_wakeup))
}

fn install_handler(signal: Signal, handler: SigHandler) -> Result<()> {
    // SaFlags::empty(): no SA_RESTART, so blocked system calls return EINTR.
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(signal, &action) }?;
    Ok(())
}

/// Clear both window flags. Done by the measuring thread right before it
/// arms the window alarm.
pub fn clear_window_flags() {
    SIGINT_FIRED.store(false, Ordering::Relaxed);
    ALARM_FIRED.store(false, Ordering::Relaxed);
}

/// Clear only the alarm flag (the energy loop re-arms per sample).
pub fn clear_alarm_flag() {
    ALARM_FIRED.store(false, Ordering::Relaxed);
}

pub fn sigint_fired() -> bool {
    SIGINT_FIRED.load(Ordering::Relaxed)
}

pub fn alarm_fired() -> bool {
    ALARM_FIRED.load(Ordering::Relaxed)
}

/// Arm the window alarm; SIGALRM arrives after `secs` seconds. `alarm(0)`
/// would cancel instead of fire, so the window is at least one second.
pub fn arm_alarm(secs: u64) {
    nix::unistd::alarm::set(secs.clamp(1, u32::MAX as u64) as libc::c_uint);
}

/// Cancel any pending alarm.
pub fn cancel_alarm() {
    nix::unistd::alarm::cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RawThread;

    // Single test: the flags are process-wide, so exercising them from
    // concurrently running unit tests would race.
    #[test]
    fn test_flag_lifecycle() {
        install().unwrap();
        clear_window_flags();
        assert!(!sigint_fired());
        assert!(!alarm_fired());

        RawThread::current().kill(libc::SIGINT).unwrap();
        assert!(sigint_fired());
        assert!(!alarm_fired());

        ALARM_FIRED.store(true, Ordering::Relaxed);
        clear_alarm_flag();
        assert!(!alarm_fired());
        assert!(sigint_fired());

        clear_window_flags();
        assert!(!sigint_fired());
        assert!(!alarm_fired());
    }
}
