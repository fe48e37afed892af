//! Interfering thread runner
//!
//! Spawns the co-runner threads of a measurement run inside a thread scope.
//! Each co-runner announces its raw `pthread_t` first, then waits for the
//! assembled [`InterferingThreads`] view (payloads such as the signal-based
//! wakeups need the full list), binds itself to the co-runner PU, builds its
//! per-thread state, and runs the payload's `other_operation` until the stop
//! flag is set.
//!
//! Stopping is two-step: the caller sets the stop flag, then delivers SIGINT
//! to every co-runner so that threads parked in blocking system calls return
//! with `EINTR` and re-check the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::Scope;

use crossbeam_channel::bounded;

use crate::action::{Action, InterferingThreads, RawThread};
use crate::error::{BenchError, Result};
use crate::topology::{ProcessorUnit, Topology};

/// Spawn `nr_threads` interfering threads pinned to `pu` and return the
/// thread view. With `pu == None` (the no-interference scenario) nothing is
/// spawned and the view is empty.
pub(crate) fn spawn_interfering<'scope, 'env, A>(
    scope: &'scope Scope<'scope, 'env>,
    action: &'env A,
    pu: Option<ProcessorUnit>,
    nr_threads: usize,
    stop: &'env AtomicBool,
) -> Result<InterferingThreads>
where
    A: Action,
{
    let Some(pu) = pu else {
        return Ok(InterferingThreads::default());
    };

    let mut self_rxs = Vec::with_capacity(nr_threads);
    let mut view_txs = Vec::with_capacity(nr_threads);

    for tid in 0..nr_threads {
        let (self_tx, self_rx) = bounded::<RawThread>(1);
        let (view_tx, view_rx) = bounded::<InterferingThreads>(1);
        self_rxs.push(self_rx);
        view_txs.push(view_tx);

        scope.spawn(move || {
            let _ = self_tx.send(RawThread::current());
            if let Err(e) = Topology::bind_current_thread(&pu) {
                log::error!("interfering thread {}: binding to PU {}: {}", tid, pu.os_index, e);
                return;
            }
            let Ok(threads) = view_rx.recv() else {
                return;
            };
            let mut state = match action.make_state(&threads) {
                Ok(state) => state,
                Err(e) => {
                    log::error!("interfering thread {}: make_state: {}", tid, e);
                    return;
                }
            };
            while !stop.load(Ordering::Relaxed) {
                match action.other_operation(&mut state, tid) {
                    Ok(()) => {}
                    // Harness poke; loop around and re-check the stop flag.
                    Err(BenchError::Interrupted) => {}
                    Err(e) => {
                        log::error!("interfering thread {}: {}", tid, e);
                        break;
                    }
                }
            }
        });
    }

    let mut handles = Vec::with_capacity(nr_threads);
    for self_rx in &self_rxs {
        let handle = self_rx.recv().map_err(|_| {
            BenchError::Topology("interfering thread exited before announcing itself".into())
        })?;
        handles.push(handle);
    }
    let threads = InterferingThreads::new(handles);
    for view_tx in &view_txs {
        // A co-runner that already bailed out dropped its receiver.
        let _ = view_tx.send(threads.clone());
    }
    Ok(threads)
}

/// Set the stop flag and poke every co-runner out of blocking system calls.
/// The scope join afterwards reaps the threads.
pub(crate) fn stop_interfering(stop: &AtomicBool, threads: &InterferingThreads) {
    stop.store(true, Ordering::Relaxed);
    for thread in threads.iter() {
        // ESRCH just means the thread already exited.
        let _ = thread.kill(libc::SIGINT);
    }
}
