//! pthread locking payloads: mutex, adaptive mutex, rwlock, spinlock
//!
//! Each payload is a [`Symmetric`] closure owning one process-private
//! pthread lock, shared by the measuring thread and all interfering
//! threads so contention happens on the same lock word exactly as the
//! scenario intends. The raw libc types live in `UnsafeCell`s; the pthread
//! calls provide the synchronisation.

use std::cell::UnsafeCell;
use std::mem;
use std::ptr;

use crate::action::{Action, Symmetric};
use crate::error::Result;
use crate::payloads::check_pthread;

struct RawMutex(UnsafeCell<libc::pthread_mutex_t>);

unsafe impl Send for RawMutex {}
unsafe impl Sync for RawMutex {}

impl RawMutex {
    fn new(kind: Option<libc::c_int>) -> Result<RawMutex> {
        let lock = RawMutex(UnsafeCell::new(unsafe { mem::zeroed() }));
        unsafe {
            match kind {
                None => {
                    check_pthread(
                        "pthread_mutex_init",
                        libc::pthread_mutex_init(lock.0.get(), ptr::null()),
                    )?;
                }
                Some(kind) => {
                    let mut attr: libc::pthread_mutexattr_t = mem::zeroed();
                    check_pthread("pthread_mutexattr_init", libc::pthread_mutexattr_init(&mut attr))?;
                    check_pthread(
                        "pthread_mutexattr_settype",
                        libc::pthread_mutexattr_settype(&mut attr, kind),
                    )?;
                    let rc = libc::pthread_mutex_init(lock.0.get(), &attr);
                    libc::pthread_mutexattr_destroy(&mut attr);
                    check_pthread("pthread_mutex_init", rc)?;
                }
            }
        }
        Ok(lock)
    }

    fn lock_unlock(&self) -> Result<()> {
        unsafe {
            check_pthread("pthread_mutex_lock", libc::pthread_mutex_lock(self.0.get()))?;
            check_pthread("pthread_mutex_unlock", libc::pthread_mutex_unlock(self.0.get()))
        }
    }
}

impl Drop for RawMutex {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_mutex_destroy(self.0.get());
        }
    }
}

/// Uncontended-path `pthread_mutex_lock`/`unlock` pair.
pub fn mutex() -> Result<impl Action<State = ()>> {
    let lock = RawMutex::new(None)?;
    Ok(Symmetric::new("pthread-mutex", move || lock.lock_unlock()))
}

/// `PTHREAD_MUTEX_ADAPTIVE_NP`: spins briefly before sleeping.
pub fn mutex_adaptive() -> Result<impl Action<State = ()>> {
    let lock = RawMutex::new(Some(libc::PTHREAD_MUTEX_ADAPTIVE_NP))?;
    Ok(Symmetric::new("pthread-mutex-adaptive", move || lock.lock_unlock()))
}

struct RawRwlock(UnsafeCell<libc::pthread_rwlock_t>);

unsafe impl Send for RawRwlock {}
unsafe impl Sync for RawRwlock {}

impl RawRwlock {
    fn new() -> Result<RawRwlock> {
        let lock = RawRwlock(UnsafeCell::new(unsafe { mem::zeroed() }));
        unsafe {
            check_pthread(
                "pthread_rwlock_init",
                libc::pthread_rwlock_init(lock.0.get(), ptr::null()),
            )?;
        }
        Ok(lock)
    }

    fn rdlock_unlock(&self) -> Result<()> {
        unsafe {
            check_pthread("pthread_rwlock_rdlock", libc::pthread_rwlock_rdlock(self.0.get()))?;
            check_pthread("pthread_rwlock_unlock", libc::pthread_rwlock_unlock(self.0.get()))
        }
    }

    fn wrlock_unlock(&self) -> Result<()> {
        unsafe {
            check_pthread("pthread_rwlock_wrlock", libc::pthread_rwlock_wrlock(self.0.get()))?;
            check_pthread("pthread_rwlock_unlock", libc::pthread_rwlock_unlock(self.0.get()))
        }
    }
}

impl Drop for RawRwlock {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_rwlock_destroy(self.0.get());
        }
    }
}

/// `pthread_rwlock` taken for reading.
pub fn rwlock_read() -> Result<impl Action<State = ()>> {
    let lock = RawRwlock::new()?;
    Ok(Symmetric::new("pthread-rwlock-rd", move || lock.rdlock_unlock()))
}

/// `pthread_rwlock` taken for writing.
pub fn rwlock_write() -> Result<impl Action<State = ()>> {
    let lock = RawRwlock::new()?;
    Ok(Symmetric::new("pthread-rwlock-wr", move || lock.wrlock_unlock()))
}

struct RawSpinlock(UnsafeCell<libc::pthread_spinlock_t>);

unsafe impl Send for RawSpinlock {}
unsafe impl Sync for RawSpinlock {}

impl RawSpinlock {
    fn new() -> Result<RawSpinlock> {
        let lock = RawSpinlock(UnsafeCell::new(unsafe { mem::zeroed() }));
        unsafe {
            check_pthread(
                "pthread_spin_init",
                libc::pthread_spin_init(lock.0.get(), libc::PTHREAD_PROCESS_PRIVATE),
            )?;
        }
        Ok(lock)
    }

    fn lock_unlock(&self) -> Result<()> {
        unsafe {
            check_pthread("pthread_spin_lock", libc::pthread_spin_lock(self.0.get()))?;
            check_pthread("pthread_spin_unlock", libc::pthread_spin_unlock(self.0.get()))
        }
    }
}

impl Drop for RawSpinlock {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_spin_destroy(self.0.get());
        }
    }
}

/// `pthread_spin_lock`/`unlock` pair.
pub fn spinlock() -> Result<impl Action<State = ()>> {
    let lock = RawSpinlock::new()?;
    Ok(Symmetric::new("pthread-spinlock", move || lock.lock_unlock()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::InterferingThreads;

    fn drive(action: &impl Action<State = ()>) {
        let mut state = action.make_state(&InterferingThreads::default()).unwrap();
        action.raw_operation(&mut state).unwrap();
        assert!(action.measured_operation(&mut state).unwrap() > 0);
    }

    #[test]
    fn test_mutex_variants_lock_and_unlock() {
        drive(&mutex().unwrap());
        drive(&mutex_adaptive().unwrap());
    }

    #[test]
    fn test_rwlock_both_modes() {
        drive(&rwlock_read().unwrap());
        drive(&rwlock_write().unwrap());
    }

    #[test]
    fn test_spinlock() {
        drive(&spinlock().unwrap());
    }

    #[test]
    fn test_lock_is_shared_across_threads() {
        let action = std::sync::Arc::new(mutex().unwrap());
        let other = std::sync::Arc::clone(&action);
        let handle = std::thread::spawn(move || {
            let mut state = other.make_state(&InterferingThreads::default()).unwrap();
            for _ in 0..1000 {
                other.raw_operation(&mut state).unwrap();
            }
        });
        let mut state = action.make_state(&InterferingThreads::default()).unwrap();
        for _ in 0..1000 {
            action.raw_operation(&mut state).unwrap();
        }
        handle.join().unwrap();
    }
}
