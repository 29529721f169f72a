//! Resolve gate
//!
//! Counts operations that are resolving a handle and lets a teardown wait
//! for the ones already in flight, without ever blocking new arrivals.
//!
//! ## Structure
//! ```text
//!   epoch              bumped by every waiter
//!   active[epoch & 1]  tickets entered during the current epoch
//! ```
//!
//! A waiter bumps the epoch so later arrivals count in the other slot,
//! then sleeps until the old slot drains. Waiters are serialized, so the
//! slot a waiter watches can only shrink.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

/// Open-barrier counter between resolving borrowers and handle teardown
pub struct ResolveGate {
    epoch: AtomicUsize,
    active: [AtomicUsize; 2],
    flip: Mutex<()>,
    drained_lock: Mutex<()>,
    drained: Condvar,
}

impl ResolveGate {
    pub fn new() -> Self {
        Self {
            epoch: AtomicUsize::new(0),
            active: [AtomicUsize::new(0), AtomicUsize::new(0)],
            flip: Mutex::new(()),
            drained_lock: Mutex::new(()),
            drained: Condvar::new(),
        }
    }

    /// Register a resolving operation. Never blocks.
    pub fn enter(&self) -> GateTicket<'_> {
        loop {
            let epoch = self.epoch.load(Ordering::SeqCst);
            let slot = epoch & 1;
            self.active[slot].fetch_add(1, Ordering::SeqCst);

            if self.epoch.load(Ordering::SeqCst) == epoch {
                return GateTicket {
                    gate: self,
                    epoch,
                    slot,
                };
            }

            // A waiter flipped between the load and the increment
            self.leave(epoch, slot);
        }
    }

    /// Block until every ticket entered before this call has been dropped.
    ///
    /// Tickets entered while waiting are not waited for.
    pub fn wait_for_resolving(&self) {
        let _flip = self.flip.lock();
        let old = self.epoch.fetch_add(1, Ordering::SeqCst) & 1;

        let mut waiting = self.drained_lock.lock();
        while self.active[old].load(Ordering::SeqCst) != 0 {
            self.drained.wait(&mut waiting);
        }
    }

    /// Number of waits started so far
    pub fn epoch(&self) -> usize {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Number of tickets currently held
    pub fn resolving(&self) -> usize {
        self.active[0].load(Ordering::SeqCst) + self.active[1].load(Ordering::SeqCst)
    }

    fn leave(&self, epoch: usize, slot: usize) {
        let prev = self.active[slot].fetch_sub(1, Ordering::SeqCst);

        // Only a waiter that flipped past our epoch can be sleeping on this slot
        if prev == 1 && self.epoch.load(Ordering::SeqCst) != epoch {
            let _waiting = self.drained_lock.lock();
            self.drained.notify_all();
        }
    }
}

impl Default for ResolveGate {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered resolving operation, released on drop
pub struct GateTicket<'a> {
    gate: &'a ResolveGate,
    epoch: usize,
    slot: usize,
}

impl Drop for GateTicket<'_> {
    fn drop(&mut self) {
        self.gate.leave(self.epoch, self.slot);
    }
}
