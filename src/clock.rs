//! Monotonic clock primitives
//!
//! All timestamps in the harness are CLOCK_MONOTONIC nanoseconds. A clock
//! read that fails would invalidate every sample taken so far, so it is
//! treated as fatal rather than propagated.

/// Current CLOCK_MONOTONIC time in nanoseconds.
pub fn monotonic_ns() -> u64 {
    unsafe {
        let mut ts = std::mem::zeroed::<libc::timespec>();
        if libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) < 0 {
            // Invalid clock id or bad pointer only; neither is recoverable.
            panic!(
                "clock_gettime(CLOCK_MONOTONIC) failed: {}",
                std::io::Error::last_os_error()
            );
        }
        (ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64)
    }
}

/// Busy-wait until the monotonic clock crosses into the next millisecond.
///
/// RAPL energy counters update on a 1 ms grid; aligning the start of a
/// sample window to a boundary keeps the first and last counter reads on
/// the same footing. Sleeping would overshoot the boundary, so this spins.
pub fn spin_until_next_millisecond() {
    let current_ms = monotonic_ns() / 1_000_000;
    while monotonic_ns() / 1_000_000 == current_ms {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_ns_is_monotonic() {
        let a = monotonic_ns();
        let b = monotonic_ns();
        assert!(b >= a);
    }

    #[test]
    fn test_spin_lands_past_a_millisecond_boundary() {
        let before_ms = monotonic_ns() / 1_000_000;
        spin_until_next_millisecond();
        let after_ms = monotonic_ns() / 1_000_000;
        assert!(after_ms > before_ms);
    }
}
