//! Object Registry
//!
//! Maps object ids to live [`ObjectHandle`]s.
//!
//! ## State
//! ```text
//!   objects: ConcurrentPool<Slot>
//!     absent              no handle, no delete running
//!     Slot::Live(h)       h is the only open handle for the id
//!     Slot::Tombstoned    a delete is running; borrows fail with Busy
//!
//!   gate: ResolveGate
//!     counts borrows that may open a backing file; delete waits for the
//!     ones that entered before its tombstone landed
//!
//!   maintenance: FairLock<()>
//!     shared     held by a borrow while it opens and installs a handle
//!     exclusive  held by the idle sweep, yielding between handles
//! ```
//!
//! ## Borrow protocol
//! 1. Look up the slot. `Live` → attach; `Tombstoned` → `Busy`.
//! 2. On a miss, enter the gate, look again, then open the file and install
//!    it with one atomic step on the slot. The first installer wins; a loser
//!    drops its own handle.
//! 3. The returned [`HandleRef`] keeps the handle open until dropped.
//!
//! Attaching to a live handle touches no lock shared between ids.
//! Retiring a handle (delete or sweep) marks it dead in the same slot
//! update that replaces it, so a borrower that read a stale `Live` slot
//! simply looks again.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{BlobError, Result};
use crate::range::ByteRange;
use crate::sync::{ConcurrentPool, FairLock, ResolveGate};

use super::handle::{HandleRef, ObjectHandle, OpenMode};

/// Longest accepted object id, in bytes
pub const MAX_OBJECT_ID_LEN: usize = 200;

#[derive(Clone)]
enum Slot {
    Live(Arc<ObjectHandle>),
    Tombstoned,
}

/// Outcome of trying to publish a freshly opened handle
enum Install {
    Won,
    Lost(Arc<ObjectHandle>),
    Busy,
}

/// Clears a delete's tombstone on every exit path
struct Tombstone<'a> {
    objects: &'a ConcurrentPool<Slot>,
    id: &'a [u8],
}

impl Drop for Tombstone<'_> {
    fn drop(&mut self) {
        self.objects.delete(self.id);
    }
}

/// Concurrent registry of open objects backed by one file each
pub struct ObjectRegistry {
    /// Directory holding the backing files
    data_dir: PathBuf,

    /// fsync after create/append
    sync_writes: bool,

    /// Live handles and tombstones, keyed by object id
    objects: ConcurrentPool<Slot>,

    /// Borrows currently able to open a backing file
    gate: ResolveGate,

    /// Excludes handle installs while the sweep retires one
    maintenance: FairLock<()>,
}

impl ObjectRegistry {
    /// Open a registry over `data_dir`, creating the directory if needed
    pub fn open(data_dir: impl Into<PathBuf>, sync_writes: bool) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(BlobError::translate)?;

        Ok(Self {
            data_dir,
            sync_writes,
            objects: ConcurrentPool::new(),
            gate: ResolveGate::new(),
            maintenance: FairLock::new(()),
        })
    }

    /// Create `id` with `data` as its entire content.
    ///
    /// Fails with `AlreadyExists` if the object is open or its file exists.
    pub fn create(&self, id: &[u8], data: &[u8]) -> Result<()> {
        let handle = self.borrow(id, OpenMode::CreateExclusive)?;
        handle.create_content(data)
    }

    /// Append `data` to `id`, creating the object if absent
    pub fn append(&self, id: &[u8], data: &[u8]) -> Result<ByteRange> {
        let handle = self.borrow(id, OpenMode::Create)?;
        handle.append(data)
    }

    /// Copy `range` of `id` into `sink`, returning the number of bytes copied
    pub fn read<W: Write + ?Sized>(&self, id: &[u8], range: ByteRange, sink: &mut W) -> Result<u64> {
        let handle = self.borrow(id, OpenMode::Existing)?;
        handle.read_into(range, sink)
    }

    /// Current length of `id`
    pub fn stat(&self, id: &[u8]) -> Result<u64> {
        let handle = self.borrow(id, OpenMode::Existing)?;
        Ok(handle.len())
    }

    /// Delete `id` and its backing file.
    ///
    /// Blocks until every borrower of the current handle is done.
    /// Fails with `Busy` if another delete of `id` is running.
    pub fn delete(&self, id: &[u8]) -> Result<()> {
        let path = self.path_for(id)?;

        let retired = self.objects.update(id, |slot| match slot.take() {
            Some(Slot::Tombstoned) => {
                *slot = Some(Slot::Tombstoned);
                Err(BlobError::Busy)
            }
            Some(Slot::Live(handle)) => {
                handle.retire();
                *slot = Some(Slot::Tombstoned);
                Ok(Some(handle))
            }
            None => {
                *slot = Some(Slot::Tombstoned);
                Ok(None)
            }
        })?;
        let _tombstone = Tombstone {
            objects: &self.objects,
            id,
        };

        // Borrows that may still open the file without seeing the tombstone
        self.gate.wait_for_resolving();

        if let Some(handle) = retired {
            handle.wait_idle();
            handle.close();
        }

        fs::remove_file(&path).map_err(BlobError::translate)?;
        tracing::debug!("Deleted object {}", String::from_utf8_lossy(id));
        Ok(())
    }

    /// Close every live handle nobody is using.
    ///
    /// Runs as a writer on the maintenance lock and yields to waiting
    /// borrowers between handles. Returns the number of handles closed.
    pub fn sweep_idle(&self) -> usize {
        let mut candidates = Vec::new();
        self.objects.for_each(|id, slot| {
            if let Slot::Live(handle) = slot {
                if handle.ref_count() == 0 {
                    candidates.push(id.to_vec());
                }
            }
        });
        if candidates.is_empty() {
            return 0;
        }

        let mut maintenance = self.maintenance.write();
        let mut closed = 0;
        for id in candidates {
            let retired = self.objects.update(&id, |slot| match slot.take() {
                Some(Slot::Live(handle)) if handle.retire_if_idle() => Some(handle),
                other => {
                    *slot = other;
                    None
                }
            });

            if let Some(handle) = retired {
                handle.close();
                closed += 1;
            }

            maintenance.yield_to_readers();
        }
        drop(maintenance);

        if closed > 0 {
            tracing::debug!("Sweep closed {} idle handles", closed);
        }
        closed
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live handles
    pub fn live_count(&self) -> usize {
        let mut count = 0;
        self.objects.for_each(|_, slot| {
            if matches!(slot, Slot::Live(_)) {
                count += 1;
            }
        });
        count
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Backing file for `id`: `{data_dir}/obj-{id}.bin`
    pub fn path_for(&self, id: &[u8]) -> Result<PathBuf> {
        let name = validate_object_id(id)?;
        Ok(self.data_dir.join(format!("obj-{}.bin", name)))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Resolve or open the handle for `id` and attach to it
    fn borrow(&self, id: &[u8], mode: OpenMode) -> Result<HandleRef> {
        let path = self.path_for(id)?;

        if let Some(borrowed) = self.attach_live(id, mode)? {
            return Ok(borrowed);
        }

        let _maintenance = self.maintenance.read();
        let _resolving = self.gate.enter();

        // A delete that flipped the gate before we entered has its tombstone visible
        if let Some(borrowed) = self.attach_live(id, mode)? {
            return Ok(borrowed);
        }

        let candidate = Arc::new(ObjectHandle::open(&path, mode, self.sync_writes)?);

        let outcome = self.objects.update(id, |slot| match slot {
            Some(Slot::Tombstoned) => Install::Busy,
            Some(Slot::Live(existing)) => Install::Lost(Arc::clone(existing)),
            None => {
                *slot = Some(Slot::Live(Arc::clone(&candidate)));
                Install::Won
            }
        });

        match outcome {
            Install::Won => {
                tracing::trace!("Opened handle for {}", path.display());
                HandleRef::acquire(&candidate).ok_or(BlobError::Busy)
            }
            Install::Lost(existing) => {
                // Never published, so this is the last reference
                drop(candidate);
                tracing::trace!("Lost install race for {}", path.display());

                if mode == OpenMode::CreateExclusive {
                    return Err(BlobError::AlreadyExists);
                }
                HandleRef::acquire(&existing).ok_or(BlobError::Busy)
            }
            Install::Busy => Err(BlobError::Busy),
        }
    }

    /// Attach to the live handle for `id`, if there is one
    fn attach_live(&self, id: &[u8], mode: OpenMode) -> Result<Option<HandleRef>> {
        loop {
            match self.objects.load(id) {
                Some(Slot::Live(handle)) => {
                    // Even a handle opened for appending defeats exclusivity
                    if mode == OpenMode::CreateExclusive {
                        return Err(BlobError::AlreadyExists);
                    }
                    if let Some(borrowed) = HandleRef::acquire(&handle) {
                        return Ok(Some(borrowed));
                    }
                    // Retired under us; the slot has already moved on
                }
                Some(Slot::Tombstoned) => return Err(BlobError::Busy),
                None => return Ok(None),
            }
        }
    }
}

/// Check that `id` is 1..=200 bytes of `[A-Za-z0-9._-]`
pub fn validate_object_id(id: &[u8]) -> Result<&str> {
    if id.is_empty() || id.len() > MAX_OBJECT_ID_LEN {
        return Err(BlobError::InvalidObjectId(format!(
            "length {} outside 1..={}",
            id.len(),
            MAX_OBJECT_ID_LEN
        )));
    }

    let allowed = |b: &u8| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-');
    if !id.iter().all(allowed) {
        return Err(BlobError::InvalidObjectId(
            String::from_utf8_lossy(id).into_owned(),
        ));
    }

    std::str::from_utf8(id).map_err(|e| BlobError::InvalidObjectId(e.to_string()))
}
