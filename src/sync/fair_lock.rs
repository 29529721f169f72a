//! Fair reader/writer lock
//!
//! Works like an `RwLock`, except that a writer can yield to waiting readers
//! at any point without giving up its position among writers.
//!
//! ## Structure
//! ```text
//!   writer (Mutex<()>)     orders writers among themselves
//!   access (RwLock<T>)     excludes readers while a writer runs
//!   readers (AtomicUsize)  pending + active shared acquirers
//! ```
//!
//! A writer holds both `writer` and `access`. Yielding releases only
//! `access` (handing it directly to parked readers) and reacquires it,
//! so no other writer can slip in.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A reader/writer lock whose writers can yield to readers
pub struct FairLock<T: ?Sized> {
    readers: AtomicUsize,
    writer: Mutex<()>,
    access: RwLock<T>,
}

impl<T> FairLock<T> {
    /// Create a new lock containing the given value
    pub fn new(value: T) -> Self {
        Self {
            readers: AtomicUsize::new(0),
            writer: Mutex::new(()),
            access: RwLock::new(value),
        }
    }

    /// Consume the lock and return the inner value
    pub fn into_inner(self) -> T {
        self.access.into_inner()
    }
}

impl<T: ?Sized> FairLock<T> {
    /// Acquire a shared lock
    pub fn read(&self) -> FairReadGuard<'_, T> {
        self.readers.fetch_add(1, Ordering::SeqCst);
        FairReadGuard {
            readers: &self.readers,
            access: self.access.read(),
        }
    }

    /// Acquire an exclusive lock, excluding readers and other writers
    pub fn write(&self) -> FairWriteGuard<'_, T> {
        let writer = self.writer.lock();
        FairWriteGuard {
            readers: &self.readers,
            access: self.access.write(),
            _writer: writer,
        }
    }

    /// Number of readers currently waiting for or holding the lock
    pub fn pending_readers(&self) -> usize {
        self.readers.load(Ordering::SeqCst)
    }

    /// Get mutable access to the underlying data
    pub fn get_mut(&mut self) -> &mut T {
        self.access.get_mut()
    }
}

impl<T: Default> Default for FairLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Shared guard for [`FairLock`]
pub struct FairReadGuard<'a, T: ?Sized> {
    readers: &'a AtomicUsize,
    access: RwLockReadGuard<'a, T>,
}

impl<T: ?Sized> Deref for FairReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.access
    }
}

impl<T: ?Sized> Drop for FairReadGuard<'_, T> {
    fn drop(&mut self) {
        self.readers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Exclusive guard for [`FairLock`]
///
/// Fields drop in declaration order, so `access` is released before `_writer`.
pub struct FairWriteGuard<'a, T: ?Sized> {
    readers: &'a AtomicUsize,
    access: RwLockWriteGuard<'a, T>,
    _writer: MutexGuard<'a, ()>,
}

impl<T: ?Sized> FairWriteGuard<'_, T> {
    /// Let waiting readers run, then reacquire exclusive access.
    ///
    /// No-op when no reader is waiting. Other writers stay excluded
    /// throughout. Takes `&mut self` so no reference into the data
    /// survives across the yield.
    pub fn yield_to_readers(&mut self) {
        if self.readers.load(Ordering::SeqCst) == 0 {
            return;
        }

        RwLockWriteGuard::unlocked_fair(&mut self.access, || ());
    }
}

impl<T: ?Sized> Deref for FairWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.access
    }
}

impl<T: ?Sized> DerefMut for FairWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.access
    }
}
