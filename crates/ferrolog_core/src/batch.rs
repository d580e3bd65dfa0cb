//! Atomic batch commits.

use crate::entry::{JournalEntry, PreparedEntry};
use crate::error::JournalResult;
use crate::journal::Journal;
use crate::listener::JournalListener;
use std::sync::Arc;

/// A group of entries committed atomically.
///
/// The batch accumulates pre-encoded entries; [`JournalBatch::commit`]
/// writes them into one dedicated segment sized exactly for the batch.
/// Either every entry becomes durable - and the listener sees one
/// `on_commit` per record, in order - or the segment is rolled back,
/// deleted, and the listener sees a single `on_failure` for the batch.
///
/// ```no_run
/// # use ferrolog_core::{Journal, JournalEntry, JournalResult};
/// # fn demo(journal: &Journal<Vec<u8>>) -> JournalResult<()> {
/// let mut batch = journal.batch();
/// batch.append(JournalEntry::new(vec![1], 0))?;
/// batch.append(JournalEntry::new(vec![2], 0))?;
/// batch.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct JournalBatch<'a, V> {
    journal: &'a Journal<V>,
    listener: Arc<dyn JournalListener<V>>,
    entries: Vec<PreparedEntry<V>>,
}

impl<'a, V: Send + 'static> JournalBatch<'a, V> {
    pub(crate) fn new(journal: &'a Journal<V>, listener: Arc<dyn JournalListener<V>>) -> Self {
        Self {
            journal,
            listener,
            entries: Vec::new(),
        }
    }

    /// Adds an entry to the batch.
    ///
    /// The payload is encoded immediately; nothing touches disk until
    /// [`JournalBatch::commit`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::Encoding`] if the entry writer
    /// fails; the batch is left unchanged.
    pub fn append(&mut self, entry: JournalEntry<V>) -> JournalResult<()> {
        let prepared = self.journal.prepare_entry(entry)?;
        self.entries.push(prepared);
        Ok(())
    }

    /// Returns the number of entries accumulated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the batch holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commits the batch atomically.
    ///
    /// Committing an empty batch is a no-op. I/O failures roll the batch
    /// back and are delivered through the listener's `on_failure`, not the
    /// return value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JournalError::Closed`] if the journal was closed.
    pub fn commit(self) -> JournalResult<()> {
        self.journal.engine_commit_batch(self.entries, &*self.listener)
    }
}

impl<V> std::fmt::Debug for JournalBatch<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalBatch")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
