//! The benchmark payload contract
//!
//! Every benchmark plugs into the harness through [`Action`]. One action
//! instance is shared by reference between the measuring thread and all
//! interfering threads; anything a thread mutates lives in its own
//! [`Action::State`], built by `make_state`.
//!
//! `make_state` receives a read-only view of the interfering threads so that
//! payloads which wake specific co-runners (signal-based wakeups) can address
//! them. Symmetric payloads, where the measured operation and the co-runner
//! operation are the same call, use the [`Symmetric`] or
//! [`SymmetricWithState`] adapters instead of implementing the trait by hand.

use std::sync::Arc;

use crate::clock;
use crate::error::{BenchError, Result};

/// Raw handle of a spawned thread, usable with `pthread_kill`.
#[derive(Clone, Copy, Debug)]
pub struct RawThread(libc::pthread_t);

// pthread_t is a plain integral thread id on Linux.
unsafe impl Send for RawThread {}
unsafe impl Sync for RawThread {}

impl RawThread {
    /// Handle of the calling thread.
    pub fn current() -> RawThread {
        RawThread(unsafe { libc::pthread_self() })
    }

    /// Deliver `signal` to this thread.
    pub fn kill(&self, signal: libc::c_int) -> Result<()> {
        let rc = unsafe { libc::pthread_kill(self.0, signal) };
        if rc != 0 {
            return Err(BenchError::Sys {
                call: "pthread_kill",
                source: std::io::Error::from_raw_os_error(rc),
            });
        }
        Ok(())
    }
}

/// Read-only view of the interfering threads of one measurement run.
///
/// Index order matches the `tid` passed to [`Action::other_operation`].
#[derive(Clone, Debug, Default)]
pub struct InterferingThreads {
    handles: Arc<Vec<RawThread>>,
}

impl InterferingThreads {
    pub fn new(handles: Vec<RawThread>) -> InterferingThreads {
        InterferingThreads {
            handles: Arc::new(handles),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, tid: usize) -> Option<RawThread> {
        self.handles.get(tid).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = RawThread> + '_ {
        self.handles.iter().copied()
    }
}

/// A benchmark payload.
///
/// The harness drives `measured_operation` on the measuring thread and
/// `other_operation` in the interfering threads' hot loops. Payload system
/// call failures are fatal; `EINTR` surfaces as [`BenchError::Interrupted`]
/// and means a measurement window is being torn down.
pub trait Action: Sync {
    /// Per-thread scratch area. Each thread gets its own instance.
    type State: Send;

    /// Name used to tag energy CSV rows.
    fn name(&self) -> &'static str;

    /// Build one thread's state. Called on the thread that will use it.
    fn make_state(&self, threads: &InterferingThreads) -> Result<Self::State>;

    /// Perform the operation exactly once, unmeasured. The energy loop calls
    /// this in its tight loop.
    fn raw_operation(&self, state: &mut Self::State) -> Result<()>;

    /// Perform the operation once and return its elapsed nanoseconds.
    ///
    /// The default brackets `raw_operation` with two monotonic clock reads.
    /// Wakeup payloads override this to return a span computed across
    /// threads.
    fn measured_operation(&self, state: &mut Self::State) -> Result<u64> {
        let start = clock::monotonic_ns();
        self.raw_operation(state)?;
        let end = clock::monotonic_ns();
        Ok(end.saturating_sub(start))
    }

    /// Body of the i-th interfering thread's hot loop.
    fn other_operation(&self, state: &mut Self::State, tid: usize) -> Result<()> {
        let _ = tid;
        self.raw_operation(state)
    }

    /// Whether the payload is meaningful without a co-runner. Wakeup
    /// benchmarks need a peer and return false.
    fn supports_non_interference(&self) -> bool {
        true
    }

    /// Whether running the payload in a tight loop for a second yields a
    /// meaningful energy-per-operation number.
    fn supports_energy_measurement(&self) -> bool {
        true
    }
}

/// Adapter for payloads where the measured and the interfering operation are
/// the same stateless call.
pub struct Symmetric<F> {
    name: &'static str,
    op: F,
}

impl<F> Symmetric<F>
where
    F: Fn() -> Result<()> + Sync,
{
    pub fn new(name: &'static str, op: F) -> Symmetric<F> {
        Symmetric { name, op }
    }
}

impl<F> Action for Symmetric<F>
where
    F: Fn() -> Result<()> + Sync,
{
    type State = ();

    fn name(&self) -> &'static str {
        self.name
    }

    fn make_state(&self, _threads: &InterferingThreads) -> Result<()> {
        Ok(())
    }

    fn raw_operation(&self, _state: &mut ()) -> Result<()> {
        (self.op)()
    }
}

/// Adapter for payloads that are symmetric but keep per-thread state.
pub struct SymmetricWithState<S, N, F> {
    name: &'static str,
    new_state: N,
    op: F,
    _marker: std::marker::PhantomData<fn() -> S>,
}

impl<S, N, F> SymmetricWithState<S, N, F>
where
    S: Send,
    N: Fn() -> Result<S> + Sync,
    F: Fn(&mut S) -> Result<()> + Sync,
{
    pub fn new(name: &'static str, new_state: N, op: F) -> SymmetricWithState<S, N, F> {
        SymmetricWithState {
            name,
            new_state,
            op,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<S, N, F> Action for SymmetricWithState<S, N, F>
where
    S: Send,
    N: Fn() -> Result<S> + Sync,
    F: Fn(&mut S) -> Result<()> + Sync,
{
    type State = S;

    fn name(&self) -> &'static str {
        self.name
    }

    fn make_state(&self, _threads: &InterferingThreads) -> Result<S> {
        (self.new_state)()
    }

    fn raw_operation(&self, state: &mut S) -> Result<()> {
        (self.op)(state)
    }
}
