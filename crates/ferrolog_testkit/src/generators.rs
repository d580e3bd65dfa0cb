//! Property-based generators for journal inputs.

use ferrolog_core::JournalEntry;
use proptest::prelude::*;

/// Strategy for entry payloads up to `max_len` bytes.
pub fn payloads(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..=max_len)
}

/// Strategy for application type tags.
pub fn entry_types() -> impl Strategy<Value = u8> {
    any::<u8>()
}

/// Strategy for byte-payload journal entries.
pub fn entries(max_payload_len: usize) -> impl Strategy<Value = JournalEntry<Vec<u8>>> {
    (payloads(max_payload_len), entry_types())
        .prop_map(|(payload, entry_type)| JournalEntry::new(payload, entry_type))
}
