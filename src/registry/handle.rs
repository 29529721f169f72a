//! Object handles
//!
//! One open backing file shared by every operation on an object id.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::ops::Deref;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::{BlobError, Result};
use crate::range::ByteRange;

/// How a borrow opens the backing file when no handle is live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// The file must already exist
    Existing,

    /// Create the file if it is missing
    Create,

    /// The file must not exist yet, and no handle may be live
    CreateExclusive,
}

/// High bit of the borrower state; the low bits count borrowers
const DEAD: usize = 1 << (usize::BITS - 1);

/// A live backing file
///
/// ## Invariants
/// - `len` only changes under `append_lock` and only grows
/// - `borrowers` packs the borrower count and the `DEAD` bit into one word
/// - the file is closed only after `DEAD` is set and the count reached zero
/// - once `DEAD` is set, [`HandleRef::acquire`] fails
pub struct ObjectHandle {
    file: RwLock<Option<File>>,
    len: AtomicU64,
    append_lock: Mutex<()>,
    borrowers: AtomicUsize,
    idle_lock: Mutex<()>,
    idle: Condvar,
    sync_writes: bool,
}

impl ObjectHandle {
    /// Open the backing file at `path`
    pub fn open(path: &Path, mode: OpenMode, sync_writes: bool) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        match mode {
            OpenMode::Existing => {}
            OpenMode::Create => {
                options.create(true);
            }
            OpenMode::CreateExclusive => {
                options.create_new(true);
            }
        }

        let file = options.open(path).map_err(BlobError::translate)?;
        let metadata = file.metadata().map_err(BlobError::translate)?;
        if !metadata.is_file() {
            return Err(BlobError::AccessDenied);
        }

        Ok(Self {
            file: RwLock::new(Some(file)),
            len: AtomicU64::new(metadata.len()),
            append_lock: Mutex::new(()),
            borrowers: AtomicUsize::new(0),
            idle_lock: Mutex::new(()),
            idle: Condvar::new(),
            sync_writes,
        })
    }

    /// Committed length of the object
    pub fn len(&self) -> u64 {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `data` as the initial content.
    ///
    /// Fails with `AlreadyExists` if anything was written first.
    pub fn create_content(&self, data: &[u8]) -> Result<()> {
        let _append = self.append_lock.lock();

        // Someone appended through this handle before us
        if self.len() != 0 {
            return Err(BlobError::AlreadyExists);
        }

        self.write_at(data, 0)?;
        self.len.store(data.len() as u64, Ordering::Release);
        Ok(())
    }

    /// Append `data` at the current end, returning the written range
    pub fn append(&self, data: &[u8]) -> Result<ByteRange> {
        let _append = self.append_lock.lock();

        let offset = self.len();
        self.write_at(data, offset)?;
        self.len.store(offset + data.len() as u64, Ordering::Release);

        Ok(ByteRange::new(offset, Some(data.len() as u64)))
    }

    /// Copy `range` into `sink`, returning the number of bytes copied.
    ///
    /// The range is clipped to the length observed when the read starts.
    pub fn read_into<W: Write + ?Sized>(&self, range: ByteRange, sink: &mut W) -> Result<u64> {
        let (start, count) = range.clip(self.len());

        let guard = self.file.read();
        let file = guard.as_ref().ok_or(BlobError::Busy)?;

        let mut section = SectionReader {
            file,
            pos: start,
            remaining: count,
        };
        io::copy(&mut section, sink).map_err(BlobError::translate)
    }

    /// Number of borrowers currently holding this handle
    pub fn ref_count(&self) -> usize {
        self.borrowers.load(Ordering::Acquire) & !DEAD
    }

    /// Whether this handle was retired
    pub fn is_dead(&self) -> bool {
        self.borrowers.load(Ordering::Acquire) & DEAD != 0
    }

    // =========================================================================
    // Lifecycle (driven by the registry)
    // =========================================================================

    /// Refuse new borrowers from now on
    pub(crate) fn retire(&self) {
        self.borrowers.fetch_or(DEAD, Ordering::AcqRel);
    }

    /// Retire only if nobody holds the handle
    pub(crate) fn retire_if_idle(&self) -> bool {
        self.borrowers
            .compare_exchange(0, DEAD, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Block until every borrower released the handle. Only valid once retired.
    pub(crate) fn wait_idle(&self) {
        debug_assert!(self.is_dead());
        let mut idle = self.idle_lock.lock();
        while self.ref_count() > 0 {
            self.idle.wait(&mut idle);
        }
    }

    /// Close the backing file. Only valid on a retired, idle handle.
    pub(crate) fn close(&self) {
        debug_assert!(self.is_dead() && self.ref_count() == 0);
        if let Some(file) = self.file.write().take() {
            drop(file);
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_at(&self, data: &[u8], offset: u64) -> Result<()> {
        let guard = self.file.read();
        let file = guard.as_ref().ok_or(BlobError::Busy)?;

        file.write_all_at(data, offset).map_err(BlobError::translate)?;
        if self.sync_writes {
            file.sync_data().map_err(BlobError::translate)?;
        }
        Ok(())
    }

    fn release(&self) {
        let prev = self.borrowers.fetch_sub(1, Ordering::AcqRel);

        // Last borrower of a retired handle; a delete may be waiting
        if prev == DEAD | 1 {
            let _idle = self.idle_lock.lock();
            self.idle.notify_all();
        }
    }
}

/// A counted claim on an [`ObjectHandle`], released on drop
pub struct HandleRef {
    handle: Arc<ObjectHandle>,
}

impl HandleRef {
    /// Attach to `handle` unless it has been retired
    pub fn acquire(handle: &Arc<ObjectHandle>) -> Option<Self> {
        let mut current = handle.borrowers.load(Ordering::Acquire);
        loop {
            if current & DEAD != 0 {
                return None;
            }
            match handle.borrowers.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        Some(Self {
            handle: Arc::clone(handle),
        })
    }
}

impl Deref for HandleRef {
    type Target = ObjectHandle;

    fn deref(&self) -> &ObjectHandle {
        &self.handle
    }
}

impl Drop for HandleRef {
    fn drop(&mut self) {
        self.handle.release();
    }
}

/// Positional reader over `[pos, pos + remaining)` of a shared file
struct SectionReader<'a> {
    file: &'a File,
    pos: u64,
    remaining: u64,
}

impl Read for SectionReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }

        let max = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let n = self.file.read_at(&mut buf[..max], self.pos)?;
        self.pos += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}
