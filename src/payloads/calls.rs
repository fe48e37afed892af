//! Trivial symmetric payloads: getuid, gettime, sched_yield
//!
//! These are the cheapest system calls the suite measures and all use the
//! symmetric adapter: the measured operation and the co-runner operation
//! are the same call.

use crate::action::{Action, Symmetric};

/// `getuid(2)`: the classic minimal syscall round trip.
pub fn getuid() -> impl Action<State = ()> {
    Symmetric::new("getuid", || {
        unsafe {
            libc::getuid();
        }
        Ok(())
    })
}

/// `clock_gettime(2)`: usually a vDSO call, so this mostly measures the
/// user-space fast path.
pub fn gettime() -> impl Action<State = ()> {
    Symmetric::new("gettime", || {
        crate::clock::monotonic_ns();
        Ok(())
    })
}

/// `sched_yield(2)` with an otherwise empty runqueue slot.
pub fn sched_yield() -> impl Action<State = ()> {
    Symmetric::new("pthread-yield", || {
        unsafe {
            libc::sched_yield();
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::InterferingThreads;
    use crate::error::Result;

    fn drive(action: &impl Action<State = ()>) -> Result<u64> {
        let mut state = action.make_state(&InterferingThreads::default())?;
        action.raw_operation(&mut state)?;
        action.measured_operation(&mut state)
    }

    #[test]
    fn test_calls_run_and_measure() {
        assert!(drive(&getuid()).unwrap() < 1_000_000_000);
        assert!(drive(&gettime()).unwrap() < 1_000_000_000);
        assert!(drive(&sched_yield()).unwrap() < 1_000_000_000);
    }

    #[test]
    fn test_calls_support_all_modes() {
        let action = getuid();
        assert!(action.supports_non_interference());
        assert!(action.supports_energy_measurement());
    }
}
