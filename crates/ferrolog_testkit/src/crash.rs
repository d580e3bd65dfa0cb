//! Crash and fault simulation.
//!
//! Two tools for exercising the journal's recovery behavior:
//!
//! - [`FlakyBackend`] injects write failures after a configurable number
//!   of appends, for driving rollback paths.
//! - [`truncate_file`] cuts a segment file at an arbitrary byte, the shape
//!   a crash mid-append leaves on disk.

use ferrolog_storage::{StorageBackend, StorageError, StorageResult};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A storage backend wrapper that fails appends past a threshold.
///
/// The first `appends_before_failure` appends pass through; every later
/// append returns an I/O error without writing. Reads, size queries, and
/// syncs keep working so the wrapped data stays inspectable.
pub struct FlakyBackend {
    inner: Box<dyn StorageBackend>,
    appends_left: AtomicUsize,
    tripped: AtomicBool,
}

impl FlakyBackend {
    /// Wraps `inner`, allowing `appends_before_failure` appends through.
    #[must_use]
    pub fn new(inner: Box<dyn StorageBackend>, appends_before_failure: usize) -> Self {
        Self {
            inner,
            appends_left: AtomicUsize::new(appends_before_failure),
            tripped: AtomicBool::new(false),
        }
    }

    /// Returns whether an injected failure has fired.
    #[must_use]
    pub fn has_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}

impl StorageBackend for FlakyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self
            .appends_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_err()
        {
            self.tripped.store(true, Ordering::SeqCst);
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }
}

/// Truncates a file to `len` bytes and syncs it.
///
/// This reproduces what an interrupted write leaves behind: a segment
/// whose tail stops mid-record. Replay is expected to emit the intact
/// prefix and ignore the rest.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or truncated.
pub fn truncate_file(path: &Path, len: u64) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()?;
    Ok(())
}
