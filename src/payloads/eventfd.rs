//! eventfd wakeup payloads
//!
//! Measures one-way thread wakeup latency. The measuring thread writes its
//! own eventfd number into the co-runner's eventfd; the co-runner's blocking
//! read returns, it reads the clock and writes that timestamp back to the
//! descriptor it was handed. The sample is the co-runner's wakeup timestamp
//! minus the start timestamp taken locally before the wake, so the return
//! path is not part of the span.
//!
//! The non-blocking variant gives the co-runners `EFD_NONBLOCK` descriptors,
//! turning their receive loop into a busy poll.

use std::os::unix::io::RawFd;

use crate::action::{Action, InterferingThreads};
use crate::clock;
use crate::error::{BenchError, Result};

struct OwnedFd(RawFd);

impl Drop for OwnedFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

fn new_eventfd(flags: libc::c_int) -> Result<OwnedFd> {
    let fd = unsafe { libc::eventfd(0, flags) };
    if fd < 0 {
        return Err(BenchError::last_sys("eventfd"));
    }
    Ok(OwnedFd(fd))
}

fn write_value(fd: RawFd, value: u64) -> Result<()> {
    let n = unsafe { libc::write(fd, &value as *const u64 as *const libc::c_void, 8) };
    if n != 8 {
        return Err(BenchError::last_sys("write"));
    }
    Ok(())
}

fn read_value(fd: RawFd) -> Result<u64> {
    let mut value: u64 = 0;
    let n = unsafe { libc::read(fd, &mut value as *mut u64 as *mut libc::c_void, 8) };
    if n != 8 {
        return Err(BenchError::last_sys("read"));
    }
    Ok(value)
}

/// Discard any pending value without blocking.
fn drain(fd: RawFd) -> Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(BenchError::last_sys("fcntl"));
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(BenchError::last_sys("fcntl"));
    }
    let mut value: u64 = 0;
    loop {
        let n = unsafe { libc::read(fd, &mut value as *mut u64 as *mut libc::c_void, 8) };
        if n != 8 {
            break;
        }
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
        return Err(BenchError::last_sys("fcntl"));
    }
    Ok(())
}

/// Per-measuring-thread cursor over the co-runner descriptors.
pub struct RemoteCursor {
    next: usize,
}

pub struct EventFdWakeup {
    name: &'static str,
    /// Descriptor the co-runners write the wakeup timestamp to.
    local_efd: OwnedFd,
    /// One descriptor per co-runner, index matches the co-runner tid.
    remote_efds: Vec<OwnedFd>,
    busy_polling: bool,
}

impl EventFdWakeup {
    /// Co-runners block in `eventfd_read`.
    pub fn blocking(nr_threads: usize) -> Result<EventFdWakeup> {
        Self::with_flags("eventfd", nr_threads, 0)
    }

    /// Co-runners busy-poll a non-blocking descriptor.
    pub fn nonblocking(nr_threads: usize) -> Result<EventFdWakeup> {
        Self::with_flags("eventfd-nonblock", nr_threads, libc::EFD_NONBLOCK)
    }

    fn with_flags(name: &'static str, nr_threads: usize, remote_flags: libc::c_int) -> Result<EventFdWakeup> {
        let remote_efds = (0..nr_threads.max(1))
            .map(|_| new_eventfd(remote_flags))
            .collect::<Result<Vec<_>>>()?;
        Ok(EventFdWakeup {
            name,
            local_efd: new_eventfd(0)?,
            remote_efds,
            busy_polling: remote_flags & libc::EFD_NONBLOCK != 0,
        })
    }

    fn wake_next(&self, cursor: &mut RemoteCursor) -> Result<u64> {
        let remote = &self.remote_efds[cursor.next];
        write_value(remote.0, self.local_efd.0 as u64)?;
        let wakeup_ns = read_value(self.local_efd.0)?;
        cursor.next = (cursor.next + 1) % self.remote_efds.len();
        Ok(wakeup_ns)
    }
}

impl Action for EventFdWakeup {
    type State = RemoteCursor;

    fn name(&self) -> &'static str {
        self.name
    }

    fn make_state(&self, _threads: &InterferingThreads) -> Result<RemoteCursor> {
        // A window that was torn down between wake and receive leaves its
        // timestamp in the descriptor; eventfd reads sum pending writes, so
        // a leftover would merge into the next window's first sample.
        drain(self.local_efd.0)?;
        Ok(RemoteCursor { next: 0 })
    }

    fn raw_operation(&self, state: &mut RemoteCursor) -> Result<()> {
        self.wake_next(state)?;
        Ok(())
    }

    fn measured_operation(&self, state: &mut RemoteCursor) -> Result<u64> {
        let start = clock::monotonic_ns();
        let wakeup_ns = self.wake_next(state)?;
        Ok(wakeup_ns.saturating_sub(start))
    }

    fn other_operation(&self, _state: &mut RemoteCursor, tid: usize) -> Result<()> {
        let remote = &self.remote_efds[tid % self.remote_efds.len()];
        let reply_fd = if self.busy_polling {
            match read_value(remote.0) {
                Ok(value) => value,
                Err(BenchError::Sys { source, .. })
                    if source.raw_os_error() == Some(libc::EAGAIN) =>
                {
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        } else {
            read_value(remote.0)?
        };
        let now = clock::monotonic_ns();
        write_value(reply_fd as RawFd, now)
    }

    fn supports_non_interference(&self) -> bool {
        false
    }
}
