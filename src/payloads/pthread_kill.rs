//! Signal-based wakeup payload
//!
//! The measuring thread wakes a co-runner with `pthread_kill(SIGUSR1)`.
//! The co-runner parks in `pause(2)`; when the signal lands it reads the
//! clock and publishes the timestamp through its per-thread mailbox, a
//! single-slot monitor of mutex plus condvar. The sample is the published
//! wakeup timestamp minus the start timestamp taken before the kill.
//!
//! Signal delivery is not queued, so a wake sent while the co-runner is
//! between `pause` calls would be absorbed silently; the waiter re-sends
//! the signal on every wait timeout to recover.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use nix::sys::signal::Signal;

use crate::action::{Action, InterferingThreads};
use crate::clock;
use crate::error::{BenchError, Result};
use crate::signals;

const WAIT_SLICE: Duration = Duration::from_millis(100);

#[derive(Default)]
struct WakeupSlot {
    wakeup_ns: u64,
    ready: bool,
}

#[derive(Default)]
struct Mailbox {
    slot: Mutex<WakeupSlot>,
    cond: Condvar,
}

pub struct PthreadKillWakeup {
    /// One mailbox per co-runner, index matches the co-runner tid.
    mailboxes: Vec<Mailbox>,
}

/// Measuring-thread state: the co-runner list and the next wake target.
pub struct KillState {
    threads: InterferingThreads,
    next: usize,
}

impl PthreadKillWakeup {
    pub fn new(nr_threads: usize) -> PthreadKillWakeup {
        PthreadKillWakeup {
            mailboxes: (0..nr_threads.max(1)).map(|_| Mailbox::default()).collect(),
        }
    }

    fn mailbox(&self, tid: usize) -> &Mailbox {
        &self.mailboxes[tid % self.mailboxes.len()]
    }
}

impl Action for PthreadKillWakeup {
    type State = KillState;

    fn name(&self) -> &'static str {
        "pthread-kill"
    }

    fn make_state(&self, threads: &InterferingThreads) -> Result<KillState> {
        signals::install_wakeup_handler(Signal::SIGUSR1)?;
        Ok(KillState {
            threads: threads.clone(),
            next: 0,
        })
    }

    fn raw_operation(&self, state: &mut KillState) -> Result<()> {
        if let Some(target) = state.threads.get(state.next) {
            target.kill(libc::SIGUSR1)?;
            state.next = (state.next + 1) % state.threads.len();
        }
        Ok(())
    }

    fn measured_operation(&self, state: &mut KillState) -> Result<u64> {
        let tid = state.next;
        let Some(target) = state.threads.get(tid) else {
            return Err(BenchError::Sys {
                call: "pthread_kill",
                source: std::io::Error::from_raw_os_error(libc::ESRCH),
            });
        };
        let mailbox = self.mailbox(tid);
        let mut slot = mailbox.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.ready = false;

        let start = clock::monotonic_ns();
        target.kill(libc::SIGUSR1)?;
        while !slot.ready {
            let (guard, timeout) = mailbox
                .cond
                .wait_timeout(slot, WAIT_SLICE)
                .unwrap_or_else(PoisonError::into_inner);
            slot = guard;
            if timeout.timed_out() && !slot.ready {
                if signals::sigint_fired() || signals::alarm_fired() {
                    return Err(BenchError::Interrupted);
                }
                // The signal landed between two pause calls; send another.
                target.kill(libc::SIGUSR1)?;
            }
        }
        let wakeup_ns = slot.wakeup_ns;
        drop(slot);

        state.next = (tid + 1) % state.threads.len();
        Ok(wakeup_ns.saturating_sub(start))
    }

    fn other_operation(&self, _state: &mut KillState, tid: usize) -> Result<()> {
        unsafe {
            // Returns once any signal was handled; EINTR is the point here.
            libc::pause();
        }
        let wakeup_ns = clock::monotonic_ns();
        let mailbox = self.mailbox(tid);
        let mut slot = mailbox.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.wakeup_ns = wakeup_ns;
        slot.ready = true;
        mailbox.cond.notify_one();
        Ok(())
    }

    fn supports_non_interference(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RawThread;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_wakeup_span_via_mailbox() {
        let action = Arc::new(PthreadKillWakeup::new(1));
        let stop = Arc::new(AtomicBool::new(false));

        let (tx, rx) = crossbeam_channel::bounded(1);
        let parked = {
            let action = Arc::clone(&action);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let _ = tx.send(RawThread::current());
                let mut state = action.make_state(&InterferingThreads::default()).unwrap();
                while !stop.load(Ordering::Relaxed) {
                    action.other_operation(&mut state, 0).unwrap();
                }
            })
        };

        let threads = InterferingThreads::new(vec![rx.recv().unwrap()]);
        let mut state = action.make_state(&threads).unwrap();
        signals::clear_window_flags();
        for _ in 0..50 {
            let ns = action.measured_operation(&mut state).unwrap();
            assert!(ns < 1_000_000_000);
        }
        stop.store(true, Ordering::Relaxed);
        // Final poke so the parked thread leaves pause() and sees the flag.
        threads.get(0).unwrap().kill(libc::SIGUSR1).unwrap();
        parked.join().unwrap();
    }
}
