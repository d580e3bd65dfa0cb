//! Listener interface for commit, replay, and failure notifications.

use crate::entry::JournalEntry;
use crate::error::JournalError;
use crate::record::JournalRecord;

/// What failed when the engine delivers [`JournalListener::on_failure`].
#[derive(Debug)]
pub enum FailureContext<'a, V> {
    /// A single entry could not be persisted.
    Entry(&'a JournalEntry<V>),
    /// A whole batch was rolled back; no entry of it was committed.
    Batch(&'a [JournalEntry<V>]),
}

/// Receives notifications from the journal engine.
///
/// Callbacks run on the thread that performed the append - the caller for
/// synchronous appends, the writer thread for asynchronous ones - and are
/// invoked while the engine still holds its directory lock, so a committed
/// record is observed before any later append of that thread completes.
/// Implementations should therefore return quickly and must not call back
/// into the journal. Panicking from a callback is a bug in the listener;
/// the engine's own state is already consistent when callbacks fire.
pub trait JournalListener<V>: Send + Sync {
    /// A record was durably appended.
    fn on_commit(&self, record: &JournalRecord<V>);

    /// A record was re-emitted during startup replay.
    ///
    /// Semantically identical to [`Self::on_commit`]; the distinct hook
    /// only tells the application it is rebuilding state rather than
    /// observing new work. Defaults to delegating to `on_commit`.
    fn on_replay(&self, record: &JournalRecord<V>) {
        self.on_commit(record);
    }

    /// Submitted work was rejected.
    ///
    /// For [`FailureContext::Batch`] the whole batch was rolled back and
    /// its segment file deleted.
    fn on_failure(&self, context: FailureContext<'_, V>, error: &JournalError);
}
