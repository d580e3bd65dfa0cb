//! The asynchronous writer thread.
//!
//! Asynchronous appends go through an unbounded FIFO channel drained by
//! one dedicated thread, which funnels every item into the synchronous
//! append path. Enqueueing never blocks; the thread blocks on `recv` when
//! idle. On-disk order therefore equals enqueue order.

use crate::entry::PreparedEntry;
use crate::journal::JournalEngine;
use crate::listener::JournalListener;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Work items for the writer thread.
pub(crate) enum WriterMessage<V> {
    /// Append one pre-encoded entry and notify its listener.
    Entry {
        prepared: PreparedEntry<V>,
        listener: Arc<dyn JournalListener<V>>,
    },
    /// Stop once everything ahead of (and behind) this message is written.
    Shutdown,
}

/// The writer thread body.
///
/// Exits when the shutdown sentinel arrives or every sender is gone.
/// Entries that raced past the sentinel are still drained before the
/// thread exits, so `close()` never abandons accepted work.
pub(crate) fn run<V: Send + 'static>(
    engine: Arc<JournalEngine<V>>,
    receiver: Receiver<WriterMessage<V>>,
) {
    loop {
        match receiver.recv() {
            Ok(WriterMessage::Entry { prepared, listener }) => {
                engine.write_prepared(prepared, &*listener);
            }
            Ok(WriterMessage::Shutdown) => break,
            // All senders dropped: the journal was torn down without a
            // sentinel (builder failure); nothing left to write.
            Err(_) => return,
        }
    }

    while let Ok(WriterMessage::Entry { prepared, listener }) = receiver.try_recv() {
        engine.write_prepared(prepared, &*listener);
    }

    tracing::debug!(journal = %engine.config.name, "writer thread drained and stopped");
}
