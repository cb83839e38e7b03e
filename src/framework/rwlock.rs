//! # Reader/Writer Lock
//!
//! A small reader/writer lock built from one mutex and two condition variables.
//! It guards the actor table: many sweeping workers read it concurrently, while
//! registration and removal of actors take it exclusively.
//!
//! ## Admission Rules
//!
//! - Any number of readers may hold the lock at once.
//! - A writer first claims *writer intent* (blocking on the entry gate while another
//!   writer is active), then waits on the drain gate until every outstanding reader
//!   has released.
//! - While a writer has claimed intent, new readers block at the entry gate.
//!
//! Once a writer has claimed intent it is never starved by readers that arrive
//! later. Two writers contending for intent are served in whatever order the
//! entry gate wakes them.
//!
//! ## Caller Contract
//!
//! Acquiring a write lock while the same thread already holds a read lock on the
//! same instance deadlocks. Use [`ReadGuard::unlocked`] to step out of a read lock
//! before taking the write lock.

use parking_lot::{Condvar, Mutex};
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Default)]
struct LockState {
    has_writer: bool,
    readers: usize,
}

/// Fair reader/writer lock protecting a value of type `T`.
pub struct ReaderWriterLock<T: ?Sized> {
    state: Mutex<LockState>,
    /// Entry gate for new readers and a new writer, closed while a writer is active.
    gate: Condvar,
    /// Where a writer waits for active readers to drain.
    drained: Condvar,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is mediated by the admission rules above. Shared
// references are only handed out while `readers > 0` and no writer holds the
// lock; the exclusive reference only while `has_writer` is set and `readers == 0`.
unsafe impl<T: ?Sized + Send> Send for ReaderWriterLock<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for ReaderWriterLock<T> {}

impl<T> ReaderWriterLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            gate: Condvar::new(),
            drained: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> ReaderWriterLock<T> {
    /// Blocks until shared access is granted.
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.acquire_read();
        ReadGuard { lock: self }
    }

    /// Blocks until exclusive access is granted.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.acquire_write();
        WriteGuard { lock: self }
    }

    /// Exclusive access through `&mut self`; no locking required.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Number of readers currently holding the lock.
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers
    }

    fn acquire_read(&self) {
        let mut state = self.state.lock();
        // Overflow guard: a saturated reader count waits for one release.
        while state.has_writer || state.readers == usize::MAX {
            self.gate.wait(&mut state);
        }
        state.readers += 1;
    }

    fn release_read(&self) {
        let mut state = self.state.lock();
        state.readers -= 1;
        if state.has_writer {
            if state.readers == 0 {
                self.drained.notify_one();
            }
        } else if state.readers == usize::MAX - 1 {
            // Room again for a reader parked by the overflow guard.
            self.gate.notify_one();
        }
    }

    fn acquire_write(&self) {
        let mut state = self.state.lock();
        while state.has_writer {
            self.gate.wait(&mut state);
        }
        state.has_writer = true;
        while state.readers > 0 {
            self.drained.wait(&mut state);
        }
    }

    fn release_write(&self) {
        {
            let mut state = self.state.lock();
            state.has_writer = false;
        }
        self.gate.notify_all();
    }
}

impl<T: Default> Default for ReaderWriterLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for ReaderWriterLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReaderWriterLock")
            .field("has_writer", &state.has_writer)
            .field("readers", &state.readers)
            .finish_non_exhaustive()
    }
}

/// Scoped shared access. Releases the read lock when dropped.
#[must_use = "if unused the read lock is released immediately"]
pub struct ReadGuard<'a, T: ?Sized> {
    lock: &'a ReaderWriterLock<T>,
}

impl<'a, T: ?Sized> ReadGuard<'a, T> {
    /// Temporarily releases the read lock while `f` runs, then reacquires it.
    ///
    /// The read lock is reacquired even when `f` unwinds, so the guard is always
    /// valid again once this returns or the panic propagates past it. Any view
    /// of the protected value taken before the call may be stale afterwards.
    pub fn unlocked<F, U>(guard: &mut Self, f: F) -> U
    where
        F: FnOnce() -> U,
    {
        struct Relock<'a, T: ?Sized>(&'a ReaderWriterLock<T>);

        impl<T: ?Sized> Drop for Relock<'_, T> {
            fn drop(&mut self) {
                self.0.acquire_read();
            }
        }

        guard.lock.release_read();
        let _relock = Relock(guard.lock);
        f()
    }
}

impl<T: ?Sized> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a live ReadGuard means readers > 0 and no writer holds the data.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// Scoped exclusive access. Releases the write lock when dropped.
#[must_use = "if unused the write lock is released immediately"]
pub struct WriteGuard<'a, T: ?Sized> {
    lock: &'a ReaderWriterLock<T>,
}

impl<T: ?Sized> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: a live WriteGuard is the only accessor of the data.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: a live WriteGuard is the only accessor of the data.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}
