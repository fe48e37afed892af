//! Thread-creation payload
//!
//! Measures how long it takes from calling spawn until the new thread is
//! actually running: the child records the end timestamp itself, so the
//! span covers creation plus first schedule, not just the library call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::action::{Action, InterferingThreads};
use crate::clock;
use crate::error::Result;

pub struct ThreadCreate;

impl Action for ThreadCreate {
    type State = Arc<AtomicU64>;

    fn name(&self) -> &'static str {
        "pthread-create"
    }

    fn make_state(&self, _threads: &InterferingThreads) -> Result<Arc<AtomicU64>> {
        Ok(Arc::new(AtomicU64::new(0)))
    }

    fn raw_operation(&self, _state: &mut Arc<AtomicU64>) -> Result<()> {
        let handle = thread::Builder::new().spawn(|| {})?;
        let _ = handle.join();
        Ok(())
    }

    fn measured_operation(&self, state: &mut Arc<AtomicU64>) -> Result<u64> {
        let slot = Arc::clone(state);
        let start = clock::monotonic_ns();
        let handle = thread::Builder::new().spawn(move || {
            slot.store(clock::monotonic_ns(), Ordering::Release);
        })?;
        let _ = handle.join();
        let end = state.load(Ordering::Acquire);
        Ok(end.saturating_sub(start))
    }
}
