//! Fixtures: a byte-payload codec and a recording listener.

use ferrolog_core::{
    EntryReader, EntryWriter, FailureContext, Journal, JournalConfig, JournalEntry, JournalError,
    JournalListener, JournalRecord, JournalResult,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Entry codec for `V = Vec<u8>`: the payload is the value itself.
///
/// The simplest possible serializer, useful whenever a test only cares
/// about journal mechanics rather than value semantics.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesCodec;

impl EntryWriter<Vec<u8>> for BytesCodec {
    fn write_entry(&self, entry: &JournalEntry<Vec<u8>>, out: &mut Vec<u8>) -> JournalResult<()> {
        out.extend_from_slice(entry.value());
        Ok(())
    }
}

impl EntryReader<Vec<u8>> for BytesCodec {
    fn read_entry(&self, payload: &[u8], entry_type: u8) -> JournalResult<JournalEntry<Vec<u8>>> {
        Ok(JournalEntry::new(payload.to_vec(), entry_type))
    }
}

/// One observed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRecord {
    /// The record id.
    pub record_id: u64,
    /// The entry's type tag.
    pub entry_type: u8,
    /// The entry's payload.
    pub payload: Vec<u8>,
}

impl SeenRecord {
    fn from(record: &JournalRecord<Vec<u8>>) -> Self {
        Self {
            record_id: record.record_id().as_u64(),
            entry_type: record.entry_type(),
            payload: record.value().clone(),
        }
    }
}

/// A listener that records every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    commits: Mutex<Vec<SeenRecord>>,
    replays: Mutex<Vec<SeenRecord>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingListener {
    /// Creates a shareable recording listener.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns all committed records, in notification order.
    #[must_use]
    pub fn commits(&self) -> Vec<SeenRecord> {
        self.commits.lock().clone()
    }

    /// Returns all replayed records, in notification order.
    #[must_use]
    pub fn replays(&self) -> Vec<SeenRecord> {
        self.replays.lock().clone()
    }

    /// Returns the rendered errors of all failure notifications.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

impl JournalListener<Vec<u8>> for RecordingListener {
    fn on_commit(&self, record: &JournalRecord<Vec<u8>>) {
        self.commits.lock().push(SeenRecord::from(record));
    }

    fn on_replay(&self, record: &JournalRecord<Vec<u8>>) {
        self.replays.lock().push(SeenRecord::from(record));
    }

    fn on_failure(&self, _context: FailureContext<'_, Vec<u8>>, error: &JournalError) {
        self.failures.lock().push(error.to_string());
    }
}

/// Opens a byte-payload journal over `path` with the [`BytesCodec`] and
/// the given listener.
///
/// # Panics
///
/// Panics if the journal cannot be opened; fixtures are for tests.
#[must_use]
pub fn bytes_journal(
    path: &Path,
    max_segment_size: u32,
    listener: Arc<RecordingListener>,
) -> Journal<Vec<u8>> {
    Journal::builder(path)
        .config(JournalConfig::new().max_segment_size(max_segment_size))
        .entry_writer(Arc::new(BytesCodec))
        .entry_reader(Arc::new(BytesCodec))
        .listener(listener)
        .open()
        .expect("fixture journal should open")
}
