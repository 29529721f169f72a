//! Concurrent Pool
//!
//! A byte-keyed map tuned for keys that are written once and read many times.
//!
//! ## Generations
//! ```text
//!   read  (ArcSwap<HashMap>)   consulted without the pool lock
//!   write (Mutex<HashMap>)     consulted under the lock when `amended`
//! ```
//!
//! Both generations share the same `Arc<PoolEntry>` cells, so an update to a
//! key already present in the read generation never touches the pool lock.
//! New keys go into the write generation. Every lookup that has to fall
//! through to the write generation counts as a miss; once misses reach the
//! size of the write generation it replaces the read generation wholesale.
//!
//! When a write generation is started it is seeded from the read generation.
//! Entries found dead during seeding are marked removed and left behind;
//! a removed cell is never written again, and callers that resolved one
//! retry from the top.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};

type Generation<V> = HashMap<Box<[u8]>, Arc<PoolEntry<V>>>;

/// State of a single cell
struct EntryState<V> {
    /// `Some` while the entry holds a valid value
    value: Option<V>,

    /// The value was deleted; the cell may be dropped at the next seeding
    dead: bool,

    /// The cell was left out of the write generation and must not be reused
    rem: bool,
}

/// A value cell shared between generations
struct PoolEntry<V> {
    state: RwLock<EntryState<V>>,
}

impl<V> PoolEntry<V> {
    fn new() -> Self {
        Self {
            state: RwLock::new(EntryState {
                value: None,
                dead: false,
                rem: false,
            }),
        }
    }

    /// True unless the cell has been removed
    fn is_usable(&self) -> bool {
        !self.state.read().rem
    }

    /// Decide whether the cell survives into a new write generation
    fn keep(&self) -> bool {
        let mut state = self.state.write();
        if state.dead {
            state.rem = true;
            return false;
        }
        true
    }

    fn get(&self) -> Option<V>
    where
        V: Clone,
    {
        self.state.read().value.clone()
    }

    /// Store `value`; hands it back if the cell was removed
    fn set(&self, value: Option<V>) -> std::result::Result<(), Option<V>> {
        let mut state = self.state.write();
        if state.rem {
            return Err(value);
        }
        state.dead = value.is_none();
        state.value = value;
        Ok(())
    }

    fn load_or_store(&self, value: V) -> std::result::Result<(V, bool), V>
    where
        V: Clone,
    {
        let mut state = self.state.write();
        if state.rem {
            return Err(value);
        }
        if let Some(existing) = &state.value {
            return Ok((existing.clone(), true));
        }
        state.value = Some(value.clone());
        state.dead = false;
        Ok((value, false))
    }

    /// Run `f` on the value under the cell lock; `None` if removed
    fn modify<R>(&self, f: impl FnOnce(&mut Option<V>) -> R) -> Option<R> {
        let mut state = self.state.write();
        if state.rem {
            return None;
        }
        let result = f(&mut state.value);
        state.dead = state.value.is_none();
        Some(result)
    }
}

/// Lock-protected half of the pool
struct WriteSide<V> {
    /// `None` while the read generation is complete
    write: Option<Generation<V>>,

    /// Lookups that had to consult `write`
    misses: usize,
}

/// Concurrent map with lock-free reads in the steady state
pub struct ConcurrentPool<V> {
    read: ArcSwap<Generation<V>>,

    /// Mirrors `write.is_some()`, readable without the lock
    amended: AtomicBool,

    write: Mutex<WriteSide<V>>,
}

impl<V: Clone> ConcurrentPool<V> {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            read: ArcSwap::from_pointee(HashMap::new()),
            amended: AtomicBool::new(false),
            write: Mutex::new(WriteSide {
                write: None,
                misses: 0,
            }),
        }
    }

    /// Load the value stored under `key`
    pub fn load(&self, key: &[u8]) -> Option<V> {
        self.lookup(key)?.get()
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn store(&self, key: &[u8], value: V) {
        let mut pending = Some(value);
        loop {
            match self.resolve(key).set(pending) {
                Ok(()) => return,
                Err(value) => pending = value,
            }
            self.sync();
        }
    }

    /// Delete the value stored under `key`, if any
    pub fn delete(&self, key: &[u8]) {
        if let Some(entry) = self.lookup(key) {
            // A removed cell is already dead
            let _ = entry.set(None);
        }
    }

    /// Return the existing value for `key`, or store `value`.
    ///
    /// The flag is `true` when the value was already present.
    pub fn load_or_store(&self, key: &[u8], value: V) -> (V, bool) {
        let mut pending = value;
        loop {
            match self.resolve(key).load_or_store(pending) {
                Ok(outcome) => return outcome,
                Err(value) => pending = value,
            }
            self.sync();
        }
    }

    /// Atomically read and modify the slot for `key`.
    ///
    /// `f` sees `None` when no value is stored and may set or clear the
    /// slot. It runs under the entry lock only; other keys are unaffected.
    /// It may be invoked again if the entry was compacted concurrently.
    pub fn update<R>(&self, key: &[u8], mut f: impl FnMut(&mut Option<V>) -> R) -> R {
        loop {
            if let Some(result) = self.resolve(key).modify(&mut f) {
                return result;
            }
            self.sync();
        }
    }

    /// Visit every stored value.
    ///
    /// Promotes the write generation first so the walk sees every key.
    /// `f` runs without any pool or entry lock held.
    pub fn for_each(&self, mut f: impl FnMut(&[u8], &V)) {
        if self.amended.load(Ordering::Acquire) {
            let mut side = self.write.lock();
            self.promote_locked(&mut side);
        }

        let read = self.read.load_full();
        for (key, entry) in read.iter() {
            if let Some(value) = entry.get() {
                f(key, &value);
            }
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of cells in the read generation, including empty ones
    pub fn read_len(&self) -> usize {
        self.read.load().len()
    }

    /// Whether a write generation currently exists
    pub fn is_amended(&self) -> bool {
        self.amended.load(Ordering::Acquire)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Find the cell for `key` without creating one
    fn lookup(&self, key: &[u8]) -> Option<Arc<PoolEntry<V>>> {
        if let Some(entry) = self.read.load().get(key) {
            if entry.is_usable() {
                return Some(Arc::clone(entry));
            }
        }

        if !self.amended.load(Ordering::Acquire) {
            return None;
        }

        let mut side = self.write.lock();

        // The write generation may have been promoted while we waited
        if let Some(entry) = self.read.load().get(key) {
            if entry.is_usable() {
                return Some(Arc::clone(entry));
            }
        }

        let found = side.write.as_ref()?.get(key).cloned();
        self.miss_locked(&mut side);
        found
    }

    /// Find the cell for `key`, creating an empty one if needed
    fn resolve(&self, key: &[u8]) -> Arc<PoolEntry<V>> {
        if let Some(entry) = self.read.load().get(key) {
            if entry.is_usable() {
                return Arc::clone(entry);
            }
        }

        let mut side = self.write.lock();

        if let Some(entry) = self.read.load().get(key) {
            if entry.is_usable() {
                return Arc::clone(entry);
            }
        }

        if let Some(entry) = side.write.as_ref().and_then(|w| w.get(key)) {
            return Arc::clone(entry);
        }

        let entry = Arc::new(PoolEntry::new());
        self.amend_locked(&mut side)
            .insert(key.into(), Arc::clone(&entry));
        entry
    }

    /// Wait for a concurrent writer holding the pool lock to finish
    fn sync(&self) {
        drop(self.write.lock());
    }

    fn miss_locked(&self, side: &mut WriteSide<V>) {
        side.misses += 1;
        let write_len = side.write.as_ref().map_or(0, |w| w.len());
        if side.misses < write_len {
            return;
        }
        self.promote_locked(side);
    }

    /// Replace the read generation with the write generation
    fn promote_locked(&self, side: &mut WriteSide<V>) {
        if let Some(write) = side.write.take() {
            self.read.store(Arc::new(write));
        }
        self.amended.store(false, Ordering::Release);
        side.misses = 0;
    }

    /// Ensure a write generation exists, seeding it from the read generation
    fn amend_locked<'a>(&self, side: &'a mut WriteSide<V>) -> &'a mut Generation<V> {
        if side.write.is_none() {
            let read = self.read.load();
            let mut write = HashMap::with_capacity(read.len());
            for (key, entry) in read.iter() {
                if entry.keep() {
                    write.insert(key.clone(), Arc::clone(entry));
                }
            }
            side.write = Some(write);
            self.amended.store(true, Ordering::Release);
        }
        side.write.get_or_insert_with(HashMap::new)
    }
}

impl<V: Clone> Default for ConcurrentPool<V> {
    fn default() -> Self {
        Self::new()
    }
}
