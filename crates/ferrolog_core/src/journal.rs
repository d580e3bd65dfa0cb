//! Journal facade and the append engine.
//!
//! [`Journal`] composes the segment directory, the replay pass, the
//! asynchronous writer thread, and the listener fan-out. One
//! `parking_lot::Mutex` - the directory mutex - serializes the whole body
//! of every synchronous append, including rollover and listener
//! notification; it is the only lock the append path needs for
//! correctness.

use crate::batch::JournalBatch;
use crate::config::JournalConfig;
use crate::entry::{EntryReader, EntryWriter, JournalEntry, PreparedEntry};
use crate::error::{JournalError, JournalResult};
use crate::idgen::{RecordIdGenerator, SequentialIdGenerator};
use crate::listener::{FailureContext, JournalListener};
use crate::naming::{NamingStrategy, PrefixNaming};
use crate::record::JournalRecord;
use crate::replay;
use crate::segment::codec::{SegmentKind, FILE_HEADER_SIZE, RECORD_HEADER_SIZE};
use crate::segment::directory::SegmentDirectory;
use crate::segment::file::{AppendOutcome, SegmentFile};
use crate::types::RecordId;
use crate::writer::{self, WriterMessage};
use ferrolog_storage::{FileBackend, StorageBackend};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Creates the storage backend for a segment file path.
///
/// The default factory opens a durable [`FileBackend`]; tests inject
/// in-memory or fault-injecting backends through
/// [`JournalBuilder::backend_factory`].
pub type BackendFactory =
    Box<dyn Fn(&Path) -> JournalResult<Box<dyn StorageBackend>> + Send + Sync>;

/// State guarded by the directory mutex.
pub(crate) struct JournalInner {
    pub(crate) directory: SegmentDirectory,
}

/// Everything shared between the facade and the writer thread.
pub(crate) struct JournalEngine<V> {
    pub(crate) config: JournalConfig,
    pub(crate) journal_path: PathBuf,
    pub(crate) inner: Mutex<JournalInner>,
    pub(crate) closed: AtomicBool,
    pub(crate) entry_writer: Arc<dyn EntryWriter<V>>,
    pub(crate) entry_reader: Arc<dyn EntryReader<V>>,
    pub(crate) listener: Arc<dyn JournalListener<V>>,
    pub(crate) id_generator: Arc<dyn RecordIdGenerator>,
    pub(crate) naming: Arc<dyn NamingStrategy>,
    pub(crate) backend_factory: BackendFactory,
}

impl<V: 'static> JournalEngine<V> {
    /// Runs one synchronous append under the directory mutex.
    ///
    /// Success and failure are both reported through `listener`; the
    /// engine recovers from rollovers internally.
    pub(crate) fn write_prepared(
        &self,
        prepared: PreparedEntry<V>,
        listener: &dyn JournalListener<V>,
    ) {
        let mut inner = self.inner.lock();
        let result = self.write_locked(&mut inner, &prepared.payload, prepared.entry.entry_type());
        match result {
            Ok(record_id) => {
                let record = JournalRecord::new(record_id, prepared.entry);
                listener.on_commit(&record);
            }
            Err(err) => {
                listener.on_failure(FailureContext::Entry(&prepared.entry), &err);
            }
        }
    }

    /// The append-with-rollover core. Caller holds the directory mutex.
    fn write_locked(
        &self,
        inner: &mut JournalInner,
        payload: &[u8],
        entry_type: u8,
    ) -> JournalResult<RecordId> {
        let outcome = {
            let head = inner.directory.head().ok_or(JournalError::Closed)?;
            let record_id = self.id_generator.next_record_id();
            head.append(payload, entry_type, record_id)?
        };

        if let AppendOutcome::Written(written) = outcome {
            return Ok(written.record_id);
        }

        // The head refused the frame. Close it and open the successor:
        // a dedicated overflow segment when the frame cannot fit a fresh
        // default segment either, a default segment otherwise. The
        // comparison is against the configured capacity, not the head's -
        // the head may be an exactly-sized batch or overflow segment.
        if let Some(head) = inner.directory.head() {
            head.close()?;
        }

        let framed_len = RECORD_HEADER_SIZE + payload.len();
        let fresh_total = (FILE_HEADER_SIZE + framed_len) as u64;
        if fresh_total > u64::from(self.config.max_segment_size) {
            let needed = u32::try_from(fresh_total).map_err(|_| {
                JournalError::append_failed("record exceeds the maximum segment size")
            })?;
            tracing::debug!(
                bytes = framed_len,
                segment_size = needed,
                "record too large for a regular segment, opening overflow segment"
            );
            self.open_segment(inner, needed, SegmentKind::Overflow)?;
        } else {
            tracing::debug!("segment full, rolling over");
            self.open_segment(inner, self.config.max_segment_size, SegmentKind::Default)?;
        }

        // The successor was sized to take this frame; anything else is
        // unrecoverable.
        let head = inner.directory.head().ok_or(JournalError::Closed)?;
        let record_id = self.id_generator.next_record_id();
        match head.append(payload, entry_type, record_id)? {
            AppendOutcome::Written(written) => Ok(written.record_id),
            outcome => Err(JournalError::append_failed(format!(
                "retry after rollover was refused: {outcome:?}"
            ))),
        }
    }

    /// Commits a batch: one exactly-sized batch segment holding either
    /// every record or, after rollback, none of them.
    pub(crate) fn commit_batch(
        &self,
        prepared: Vec<PreparedEntry<V>>,
        listener: &dyn JournalListener<V>,
    ) -> JournalResult<()> {
        if prepared.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock();
        let mark = self.id_generator.last_generated_record_id();

        match self.try_commit_batch(&mut inner, &prepared, mark) {
            Ok(ids) => {
                let records: Vec<JournalRecord<V>> = ids
                    .into_iter()
                    .zip(prepared)
                    .map(|(id, p)| JournalRecord::new(id, p.entry))
                    .collect();
                for record in &records {
                    listener.on_commit(record);
                }
                Ok(())
            }
            Err(err) => {
                let entries: Vec<JournalEntry<V>> =
                    prepared.into_iter().map(|p| p.entry).collect();
                listener.on_failure(FailureContext::Batch(&entries), &err);
                Ok(())
            }
        }
    }

    fn try_commit_batch(
        &self,
        inner: &mut JournalInner,
        prepared: &[PreparedEntry<V>],
        mark: RecordId,
    ) -> JournalResult<Vec<RecordId>> {
        let data_size: usize = prepared
            .iter()
            .map(|p| RECORD_HEADER_SIZE + p.payload.len())
            .sum();
        let batch_size = u32::try_from(FILE_HEADER_SIZE + data_size)
            .map_err(|_| JournalError::append_failed("batch exceeds the maximum segment size"))?;

        self.open_segment(inner, batch_size, SegmentKind::Batch)?;

        match self.append_batch_records(inner, prepared) {
            Ok(ids) => Ok(ids),
            Err(err) => {
                self.rollback_batch(inner, mark);
                Err(err)
            }
        }
    }

    fn append_batch_records(
        &self,
        inner: &mut JournalInner,
        prepared: &[PreparedEntry<V>],
    ) -> JournalResult<Vec<RecordId>> {
        let head = inner.directory.head().ok_or(JournalError::Closed)?;
        let mut ids = Vec::with_capacity(prepared.len());
        for p in prepared {
            let record_id = self.id_generator.next_record_id();
            match head.append(&p.payload, p.entry.entry_type(), record_id)? {
                AppendOutcome::Written(written) => ids.push(written.record_id),
                outcome => {
                    return Err(JournalError::append_failed(format!(
                        "batch record refused by its exactly-sized segment: {outcome:?}"
                    )))
                }
            }
        }
        Ok(ids)
    }

    /// Discards the batch segment pushed by [`Self::try_commit_batch`] and
    /// rewinds the id generator to the pre-batch mark.
    fn rollback_batch(&self, inner: &mut JournalInner, mark: RecordId) {
        if let Some(segment) = inner.directory.pop_head() {
            if let Err(err) = segment.close() {
                tracing::warn!(%err, segment = %segment.log_number(), "close failed during batch rollback");
            }
            let path = self.journal_path.join(segment.file_name());
            if path.exists() {
                if let Err(err) = std::fs::remove_file(&path) {
                    tracing::warn!(%err, path = %path.display(), "delete failed during batch rollback");
                }
            }
        }
        self.id_generator.notify_highest_record_id(mark);
    }

    /// Creates a segment through the naming strategy and backend factory
    /// and pushes it as the directory head.
    fn open_segment(
        &self,
        inner: &mut JournalInner,
        max_size: u32,
        kind: SegmentKind,
    ) -> JournalResult<()> {
        let log_number = inner.directory.next_log_number();
        let file_name = self.naming.generate(log_number);
        let path = self.journal_path.join(&file_name);
        let backend = (self.backend_factory)(&path)?;
        let segment = SegmentFile::create(backend, file_name, log_number, max_size, kind)?;
        inner.directory.push_head(segment)
    }
}

/// A durable, append-only journal for values of type `V`.
///
/// Entries are recorded to segment files in a journal directory such that
/// after a crash, every entry acknowledged as committed is replayed in
/// commit order on the next open. See [`JournalBuilder`] for construction.
///
/// # Write paths
///
/// - [`Journal::append`] enqueues the entry for a dedicated writer thread
///   and returns immediately; the listener is notified from that thread.
/// - [`Journal::append_sync`] writes on the calling thread and notifies
///   the listener before returning.
/// - [`Journal::batch`] accumulates entries and commits them atomically
///   into a dedicated, exactly-sized segment.
///
/// Failures after submission are delivered through the listener's
/// `on_failure` hook; only encoding errors and use after [`Journal::close`]
/// surface as `Err` on the append methods themselves.
pub struct Journal<V> {
    engine: Arc<JournalEngine<V>>,
    sender: Sender<WriterMessage<V>>,
    writer_thread: Mutex<Option<JoinHandle<()>>>,
}

impl<V: Send + 'static> Journal<V> {
    /// Starts building a journal over the given directory.
    #[must_use]
    pub fn builder(path: impl Into<PathBuf>) -> JournalBuilder<V> {
        JournalBuilder::new(path)
    }

    /// Enqueues an entry for the writer thread, notifying the journal's
    /// listener on commit.
    ///
    /// The payload is encoded before enqueueing, so an encoder failure is
    /// returned here and never reaches the queue. The call itself never
    /// blocks on I/O.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Encoding`] if the entry writer fails and
    /// [`JournalError::Closed`] after [`Journal::close`].
    pub fn append(&self, entry: JournalEntry<V>) -> JournalResult<()> {
        self.append_with(entry, Arc::clone(&self.engine.listener))
    }

    /// Like [`Journal::append`], notifying `listener` instead of the
    /// journal's own.
    ///
    /// # Errors
    ///
    /// See [`Journal::append`].
    pub fn append_with(
        &self,
        entry: JournalEntry<V>,
        listener: Arc<dyn JournalListener<V>>,
    ) -> JournalResult<()> {
        if self.engine.closed.load(Ordering::SeqCst) {
            return Err(JournalError::Closed);
        }
        let prepared = PreparedEntry::prepare(entry, &*self.engine.entry_writer)?;
        self.sender
            .send(WriterMessage::Entry { prepared, listener })
            .map_err(|_| JournalError::Closed)?;
        Ok(())
    }

    /// Appends an entry on the calling thread.
    ///
    /// The listener's `on_commit` runs before this returns (still under
    /// the journal's directory lock). I/O failures are delivered through
    /// `on_failure` rather than the return value.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Encoding`] if the entry writer fails and
    /// [`JournalError::Closed`] after [`Journal::close`].
    pub fn append_sync(&self, entry: JournalEntry<V>) -> JournalResult<()> {
        self.append_sync_with(entry, Arc::clone(&self.engine.listener))
    }

    /// Like [`Journal::append_sync`], notifying `listener` instead of the
    /// journal's own.
    ///
    /// # Errors
    ///
    /// See [`Journal::append_sync`].
    pub fn append_sync_with(
        &self,
        entry: JournalEntry<V>,
        listener: Arc<dyn JournalListener<V>>,
    ) -> JournalResult<()> {
        if self.engine.closed.load(Ordering::SeqCst) {
            return Err(JournalError::Closed);
        }
        let prepared = PreparedEntry::prepare(entry, &*self.engine.entry_writer)?;
        self.engine.write_prepared(prepared, &*listener);
        Ok(())
    }

    /// Starts an atomic batch, notifying the journal's listener.
    #[must_use]
    pub fn batch(&self) -> JournalBatch<'_, V> {
        self.batch_with(Arc::clone(&self.engine.listener))
    }

    /// Starts an atomic batch, notifying `listener` instead of the
    /// journal's own.
    #[must_use]
    pub fn batch_with(&self, listener: Arc<dyn JournalListener<V>>) -> JournalBatch<'_, V> {
        JournalBatch::new(self, listener)
    }

    /// Returns the most recently generated record id.
    #[must_use]
    pub fn last_record_id(&self) -> RecordId {
        self.engine.id_generator.last_generated_record_id()
    }

    /// Returns the journal's directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.engine.journal_path
    }

    /// Returns the journal's diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.engine.config.name
    }

    /// Returns whether the journal is still accepting entries.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.engine.closed.load(Ordering::SeqCst)
    }

    /// Shuts the journal down: stops admitting entries, drains the async
    /// queue, then closes every segment. Idempotent; also runs on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment fails to sync while closing.
    pub fn close(&self) -> JournalResult<()> {
        if self.engine.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!(journal = %self.engine.config.name, "journal shutting down");

        // The sentinel breaks the writer out of its blocking recv once the
        // queue is drained. Join before touching segments so no write
        // races the close below. The directory mutex is NOT held here.
        let _ = self.sender.send(WriterMessage::Shutdown);
        let handle = self.writer_thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("journal writer thread panicked before shutdown");
            }
        }

        let inner = self.engine.inner.lock();
        for segment in inner.directory.iter_oldest_to_newest() {
            segment.close()?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &JournalEngine<V> {
        &self.engine
    }

    pub(crate) fn engine_commit_batch(
        &self,
        prepared: Vec<PreparedEntry<V>>,
        listener: &dyn JournalListener<V>,
    ) -> JournalResult<()> {
        if self.engine.closed.load(Ordering::SeqCst) {
            return Err(JournalError::Closed);
        }
        self.engine.commit_batch(prepared, listener)
    }

    pub(crate) fn prepare_entry(&self, entry: JournalEntry<V>) -> JournalResult<PreparedEntry<V>> {
        PreparedEntry::prepare(entry, &*self.engine.entry_writer)
    }
}

impl<V> Drop for Journal<V> {
    fn drop(&mut self) {
        // Mirror close() without the V: Send bound Drop cannot carry.
        if self.engine.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.sender.send(WriterMessage::Shutdown);
        let handle = self.writer_thread.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        let inner = self.engine.inner.lock();
        for segment in inner.directory.iter_oldest_to_newest() {
            let _ = segment.close();
        }
    }
}

impl<V> std::fmt::Debug for Journal<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("name", &self.engine.config.name)
            .field("path", &self.engine.journal_path)
            .field("open", &!self.engine.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Builder for [`Journal`].
///
/// The entry writer, entry reader, and listener are required; the id
/// generator, naming strategy, backend factory, and configuration default
/// to [`SequentialIdGenerator`], [`PrefixNaming`], durable
/// [`FileBackend`]s, and [`JournalConfig::default`].
pub struct JournalBuilder<V> {
    path: PathBuf,
    config: JournalConfig,
    entry_writer: Option<Arc<dyn EntryWriter<V>>>,
    entry_reader: Option<Arc<dyn EntryReader<V>>>,
    listener: Option<Arc<dyn JournalListener<V>>>,
    id_generator: Arc<dyn RecordIdGenerator>,
    naming: Arc<dyn NamingStrategy>,
    backend_factory: BackendFactory,
}

impl<V: Send + 'static> JournalBuilder<V> {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: JournalConfig::default(),
            entry_writer: None,
            entry_reader: None,
            listener: None,
            id_generator: Arc::new(SequentialIdGenerator::new()),
            naming: Arc::new(PrefixNaming::default()),
            backend_factory: Box::new(|path| {
                let backend = FileBackend::open_durable(path)?;
                Ok(Box::new(backend) as Box<dyn StorageBackend>)
            }),
        }
    }

    /// Sets the journal configuration.
    #[must_use]
    pub fn config(mut self, config: JournalConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the entry serializer. Required.
    #[must_use]
    pub fn entry_writer(mut self, writer: Arc<dyn EntryWriter<V>>) -> Self {
        self.entry_writer = Some(writer);
        self
    }

    /// Sets the entry deserializer. Required.
    #[must_use]
    pub fn entry_reader(mut self, reader: Arc<dyn EntryReader<V>>) -> Self {
        self.entry_reader = Some(reader);
        self
    }

    /// Sets the listener receiving commit, replay, and failure
    /// notifications. Required.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn JournalListener<V>>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Replaces the default sequential record-id generator.
    #[must_use]
    pub fn id_generator(mut self, generator: Arc<dyn RecordIdGenerator>) -> Self {
        self.id_generator = generator;
        self
    }

    /// Replaces the default file naming strategy.
    #[must_use]
    pub fn naming_strategy(mut self, naming: Arc<dyn NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    /// Replaces the default durable file backend factory.
    #[must_use]
    pub fn backend_factory(mut self, factory: BackendFactory) -> Self {
        self.backend_factory = factory;
        self
    }

    /// Opens the journal: validates configuration, replays any existing
    /// segments, starts the writer thread, and opens the first segment.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Configuration`] for an invalid
    /// configuration, a missing collaborator, or a path that is not an
    /// existing directory; [`JournalError::Replay`] if existing segments
    /// cannot be replayed; or an I/O error from opening the first segment.
    pub fn open(self) -> JournalResult<Journal<V>> {
        self.config.validate()?;

        let entry_writer = self
            .entry_writer
            .ok_or_else(|| JournalError::configuration("entry writer is required"))?;
        let entry_reader = self
            .entry_reader
            .ok_or_else(|| JournalError::configuration("entry reader is required"))?;
        let listener = self
            .listener
            .ok_or_else(|| JournalError::configuration("listener is required"))?;

        if !self.path.is_dir() {
            return Err(JournalError::configuration(format!(
                "journal path is not a directory: {}",
                self.path.display()
            )));
        }

        tracing::info!(
            journal = %self.config.name,
            path = %self.path.display(),
            "journal starting up"
        );

        let engine = Arc::new(JournalEngine {
            config: self.config,
            journal_path: self.path,
            inner: Mutex::new(JournalInner {
                directory: SegmentDirectory::new(),
            }),
            closed: AtomicBool::new(false),
            entry_writer,
            entry_reader,
            listener,
            id_generator: self.id_generator,
            naming: self.naming,
            backend_factory: self.backend_factory,
        });

        // Replay existing segments before any writes are admitted.
        {
            let mut inner = engine.inner.lock();
            let summary = replay::replay_into(
                &engine.journal_path,
                &*engine.naming,
                &engine.backend_factory,
                &*engine.entry_reader,
                &*engine.listener,
                &mut inner.directory,
            )?;
            if let Some(max_id) = summary.max_record_id {
                engine.id_generator.notify_highest_record_id(max_id);
            }
        }

        let (sender, receiver) = mpsc::channel();
        let writer_engine = Arc::clone(&engine);
        let handle = std::thread::Builder::new()
            .name(format!("journal-writer-{}", engine.config.name))
            .spawn(move || writer::run(writer_engine, receiver))?;

        // Replay done, writer running: open the first writable segment.
        {
            let mut inner = engine.inner.lock();
            let max_size = engine.config.max_segment_size;
            engine.open_segment(&mut inner, max_size, SegmentKind::Default)?;
        }

        Ok(Journal {
            engine,
            sender,
            writer_thread: Mutex::new(Some(handle)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogNumber;
    use ferrolog_storage::{InMemoryBackend, StorageError, StorageResult};
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    struct BytesCodec;

    impl EntryWriter<Vec<u8>> for BytesCodec {
        fn write_entry(
            &self,
            entry: &JournalEntry<Vec<u8>>,
            out: &mut Vec<u8>,
        ) -> JournalResult<()> {
            out.extend_from_slice(entry.value());
            Ok(())
        }
    }

    impl EntryReader<Vec<u8>> for BytesCodec {
        fn read_entry(&self, payload: &[u8], entry_type: u8) -> JournalResult<JournalEntry<Vec<u8>>> {
            Ok(JournalEntry::new(payload.to_vec(), entry_type))
        }
    }

    #[derive(Default)]
    struct Recording {
        commits: Mutex<Vec<(u64, Vec<u8>)>>,
        failures: Mutex<Vec<String>>,
    }

    impl JournalListener<Vec<u8>> for Recording {
        fn on_commit(&self, record: &JournalRecord<Vec<u8>>) {
            self.commits
                .lock()
                .push((record.record_id().as_u64(), record.value().clone()));
        }

        fn on_failure(&self, _context: FailureContext<'_, Vec<u8>>, error: &JournalError) {
            self.failures.lock().push(error.to_string());
        }
    }

    fn memory_factory() -> BackendFactory {
        Box::new(|_path| Ok(Box::new(InMemoryBackend::new()) as Box<dyn StorageBackend>))
    }

    fn open_journal(
        path: &Path,
        max_segment_size: u32,
        listener: Arc<Recording>,
        factory: BackendFactory,
    ) -> Journal<Vec<u8>> {
        Journal::builder(path)
            .config(JournalConfig::new().max_segment_size(max_segment_size))
            .entry_writer(Arc::new(BytesCodec))
            .entry_reader(Arc::new(BytesCodec))
            .listener(listener)
            .backend_factory(factory)
            .open()
            .unwrap()
    }

    #[test]
    fn sync_appends_commit_in_order() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());
        let journal = open_journal(dir.path(), 4096, Arc::clone(&listener), memory_factory());

        journal.append_sync(JournalEntry::new(b"A".to_vec(), 1)).unwrap();
        journal.append_sync(JournalEntry::new(b"BB".to_vec(), 1)).unwrap();
        journal.append_sync(JournalEntry::new(b"CCC".to_vec(), 2)).unwrap();

        let commits = listener.commits.lock();
        assert_eq!(
            *commits,
            vec![
                (1, b"A".to_vec()),
                (2, b"BB".to_vec()),
                (3, b"CCC".to_vec()),
            ]
        );
        assert_eq!(journal.last_record_id(), RecordId::new(3));

        let inner = journal.engine().inner.lock();
        assert_eq!(inner.directory.len(), 1);
        assert_eq!(inner.directory.head().unwrap().position().unwrap(), 82);
    }

    #[test]
    fn async_appends_drain_on_close() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());
        let journal = open_journal(dir.path(), 4096, Arc::clone(&listener), memory_factory());

        for i in 0..20u8 {
            journal.append(JournalEntry::new(vec![i], 1)).unwrap();
        }
        journal.close().unwrap();

        let commits = listener.commits.lock();
        assert_eq!(commits.len(), 20);
        for (i, (_, payload)) in commits.iter().enumerate() {
            assert_eq!(payload, &vec![i as u8]);
        }
    }

    #[test]
    fn full_segment_rolls_over_to_a_new_default_segment() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());
        // Capacity 60: a 15-byte payload frames to 32 bytes; the first
        // lands at 25..57, the second no longer fits.
        let journal = open_journal(dir.path(), 60, Arc::clone(&listener), memory_factory());

        journal.append_sync(JournalEntry::new(vec![1u8; 15], 1)).unwrap();
        journal.append_sync(JournalEntry::new(vec![2u8; 15], 1)).unwrap();

        assert_eq!(listener.commits.lock().len(), 2);

        let inner = journal.engine().inner.lock();
        assert_eq!(inner.directory.len(), 2);
        let head = inner.directory.head().unwrap();
        assert_eq!(head.log_number(), LogNumber::new(1));
        assert_eq!(head.kind(), SegmentKind::Default);
        assert_eq!(head.position().unwrap(), 57);

        let first = inner.directory.iter_oldest_to_newest().next().unwrap();
        assert!(first.is_closed());
    }

    #[test]
    fn oversize_record_gets_an_exactly_sized_overflow_segment() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());
        let journal = open_journal(dir.path(), 100, Arc::clone(&listener), memory_factory());

        journal.append_sync(JournalEntry::new(vec![9u8; 200], 1)).unwrap();

        assert_eq!(listener.commits.lock().len(), 1);

        let inner = journal.engine().inner.lock();
        assert_eq!(inner.directory.len(), 2);
        let head = inner.directory.head().unwrap();
        assert_eq!(head.kind(), SegmentKind::Overflow);
        assert_eq!(head.max_size(), 242);
        assert_eq!(head.position().unwrap(), 242);
    }

    #[test]
    fn append_after_close_is_rejected() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());
        let journal = open_journal(dir.path(), 4096, Arc::clone(&listener), memory_factory());

        journal.close().unwrap();
        journal.close().unwrap(); // idempotent
        assert!(!journal.is_open());

        assert!(matches!(
            journal.append_sync(JournalEntry::new(vec![1], 1)),
            Err(JournalError::Closed)
        ));
        assert!(matches!(
            journal.append(JournalEntry::new(vec![1], 1)),
            Err(JournalError::Closed)
        ));
    }

    #[test]
    fn builder_requires_collaborators() {
        let dir = tempdir().unwrap();
        let result = Journal::<Vec<u8>>::builder(dir.path())
            .entry_writer(Arc::new(BytesCodec))
            .entry_reader(Arc::new(BytesCodec))
            .open();
        assert!(matches!(result, Err(JournalError::Configuration { .. })));
    }

    #[test]
    fn builder_requires_an_existing_directory() {
        let dir = tempdir().unwrap();
        let result = Journal::<Vec<u8>>::builder(dir.path().join("missing"))
            .entry_writer(Arc::new(BytesCodec))
            .entry_reader(Arc::new(BytesCodec))
            .listener(Arc::new(Recording::default()))
            .open();
        assert!(matches!(result, Err(JournalError::Configuration { .. })));
    }

    #[test]
    fn batch_commit_fills_one_exactly_sized_segment() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());
        let journal = open_journal(dir.path(), 4096, Arc::clone(&listener), memory_factory());

        let mut batch = journal.batch();
        for i in 0..5u8 {
            batch.append(JournalEntry::new(vec![i; 10], 1)).unwrap();
        }
        assert_eq!(batch.len(), 5);
        batch.commit().unwrap();

        let commits = listener.commits.lock();
        assert_eq!(commits.len(), 5);
        let ids: Vec<u64> = commits.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        drop(commits);

        let inner = journal.engine().inner.lock();
        let head = inner.directory.head().unwrap();
        assert_eq!(head.kind(), SegmentKind::Batch);
        assert_eq!(head.max_size(), 160);
        assert_eq!(head.position().unwrap(), 160);
    }

    #[test]
    fn append_after_batch_rolls_over_from_the_full_batch_segment() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());
        let journal = open_journal(dir.path(), 4096, Arc::clone(&listener), memory_factory());

        let mut batch = journal.batch();
        batch.append(JournalEntry::new(vec![1; 10], 1)).unwrap();
        batch.commit().unwrap();

        journal.append_sync(JournalEntry::new(vec![2; 10], 1)).unwrap();

        let inner = journal.engine().inner.lock();
        let head = inner.directory.head().unwrap();
        assert_eq!(head.kind(), SegmentKind::Default);
        assert_eq!(head.max_size(), 4096);
        assert_eq!(inner.directory.len(), 3);
        assert_eq!(listener.commits.lock().len(), 2);
    }

    #[test]
    fn empty_batch_commit_is_a_noop() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());
        let journal = open_journal(dir.path(), 4096, Arc::clone(&listener), memory_factory());

        journal.batch().commit().unwrap();

        assert!(listener.commits.lock().is_empty());
        assert!(listener.failures.lock().is_empty());
        let inner = journal.engine().inner.lock();
        assert_eq!(inner.directory.len(), 1);
    }

    /// Backend that fails every append past a threshold.
    struct FailingBackend {
        inner: InMemoryBackend,
        appends_left: AtomicUsize,
    }

    impl FailingBackend {
        fn new(appends_before_failure: usize) -> Self {
            Self {
                inner: InMemoryBackend::new(),
                appends_left: AtomicUsize::new(appends_before_failure),
            }
        }
    }

    impl StorageBackend for FailingBackend {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }

        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            if self.appends_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            }).is_err()
            {
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

    #[test]
    fn failed_batch_rolls_back_segment_and_record_ids() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());

        // First created segment (the initial head) behaves; the second -
        // the batch segment - accepts its header and two records, then
        // fails on the third.
        let segments_created = AtomicUsize::new(0);
        let factory: BackendFactory = Box::new(move |_path| {
            let n = segments_created.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Ok(Box::new(InMemoryBackend::new()) as Box<dyn StorageBackend>)
            } else {
                Ok(Box::new(FailingBackend::new(3)) as Box<dyn StorageBackend>)
            }
        });

        let journal = open_journal(dir.path(), 4096, Arc::clone(&listener), factory);

        let mut batch = journal.batch();
        for i in 0..5u8 {
            batch.append(JournalEntry::new(vec![i; 10], 1)).unwrap();
        }
        batch.commit().unwrap();

        assert!(listener.commits.lock().is_empty());
        assert_eq!(listener.failures.lock().len(), 1);
        assert_eq!(journal.last_record_id(), RecordId::new(0));

        let inner = journal.engine().inner.lock();
        assert_eq!(inner.directory.len(), 1);
        assert_eq!(inner.directory.head().unwrap().kind(), SegmentKind::Default);
    }

    #[test]
    fn io_failure_on_sync_append_reaches_the_listener() {
        let dir = tempdir().unwrap();
        let listener = Arc::new(Recording::default());

        // The initial segment takes its header, one record, then fails.
        let factory: BackendFactory =
            Box::new(|_path| Ok(Box::new(FailingBackend::new(2)) as Box<dyn StorageBackend>));
        let journal = open_journal(dir.path(), 4096, Arc::clone(&listener), factory);

        journal.append_sync(JournalEntry::new(vec![1], 1)).unwrap();
        journal.append_sync(JournalEntry::new(vec![2], 1)).unwrap();

        assert_eq!(listener.commits.lock().len(), 1);
        assert_eq!(listener.failures.lock().len(), 1);
    }
}
