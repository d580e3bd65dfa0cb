//! Committed records as surfaced to listeners.

use crate::entry::JournalEntry;
use crate::types::RecordId;

/// A durably written journal record.
///
/// Records are created by a successful append (or rebuilt during replay),
/// never mutated, and surfaced exactly once to the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRecord<V> {
    record_id: RecordId,
    entry: JournalEntry<V>,
}

impl<V> JournalRecord<V> {
    /// Creates a record from an id and its entry.
    #[must_use]
    pub fn new(record_id: RecordId, entry: JournalEntry<V>) -> Self {
        Self { record_id, entry }
    }

    /// Returns the record id.
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    /// Returns the journaled entry.
    pub fn entry(&self) -> &JournalEntry<V> {
        &self.entry
    }

    /// Returns the journaled value.
    pub fn value(&self) -> &V {
        self.entry.value()
    }

    /// Returns the application-defined type tag.
    #[must_use]
    pub fn entry_type(&self) -> u8 {
        self.entry.entry_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accessors() {
        let record = JournalRecord::new(RecordId::new(3), JournalEntry::new("v", 2));
        assert_eq!(record.record_id(), RecordId::new(3));
        assert_eq!(record.entry_type(), 2);
        assert_eq!(*record.value(), "v");
    }
}
