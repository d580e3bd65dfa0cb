//! Journal entries and the application-side serialization seam.
//!
//! The engine treats the value type `V` opaquely. Applications provide a
//! writer that turns values into bytes and a reader that rebuilds values
//! from bytes plus the entry's type tag. Payloads are encoded exactly once
//! per entry - retries after a segment rollover and passage through the
//! async queue reuse the cached bytes.

use crate::error::JournalResult;

/// A value submitted for journaling, tagged with an application-defined
/// type byte.
///
/// The type tag is carried through the on-disk format and handed back to
/// the [`EntryReader`] on replay; the engine never interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry<V> {
    value: V,
    entry_type: u8,
}

impl<V> JournalEntry<V> {
    /// Creates a new entry.
    #[must_use]
    pub fn new(value: V, entry_type: u8) -> Self {
        Self { value, entry_type }
    }

    /// Returns the wrapped value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns the application-defined type tag.
    #[must_use]
    pub fn entry_type(&self) -> u8 {
        self.entry_type
    }

    /// Consumes the entry, returning the value.
    pub fn into_value(self) -> V {
        self.value
    }
}

/// Serializes values of type `V` into journal payloads.
///
/// Implementations must be deterministic for equal inputs and must not
/// buffer state across calls.
pub trait EntryWriter<V>: Send + Sync {
    /// Encodes `entry` into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded; the entry is then
    /// rejected before any I/O happens.
    fn write_entry(&self, entry: &JournalEntry<V>, out: &mut Vec<u8>) -> JournalResult<()>;
}

/// Deserializes journal payloads back into values of type `V`.
///
/// The inverse of [`EntryWriter`], used during replay.
pub trait EntryReader<V>: Send + Sync {
    /// Decodes a payload into an entry, given the stored type tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be decoded.
    fn read_entry(&self, payload: &[u8], entry_type: u8) -> JournalResult<JournalEntry<V>>;
}

/// An entry together with its encoded payload.
///
/// Built once on submission so the expensive encode never runs twice.
#[derive(Debug)]
pub(crate) struct PreparedEntry<V> {
    pub(crate) entry: JournalEntry<V>,
    pub(crate) payload: Vec<u8>,
}

impl<V> PreparedEntry<V> {
    /// Largest encodable payload.
    ///
    /// The record length field is a `u32` that also counts the record
    /// header, and an overflow segment must fit the file header too.
    pub(crate) const MAX_PAYLOAD_SIZE: usize =
        u32::MAX as usize - crate::segment::codec::OVERFLOW_OVERHEAD;

    /// Encodes `entry` through `writer`, caching the payload bytes.
    pub(crate) fn prepare(
        entry: JournalEntry<V>,
        writer: &dyn EntryWriter<V>,
    ) -> JournalResult<Self> {
        let mut payload = Vec::new();
        writer.write_entry(&entry, &mut payload)?;
        if payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(crate::error::JournalError::encoding(format!(
                "payload of {} bytes exceeds the maximum of {} bytes",
                payload.len(),
                Self::MAX_PAYLOAD_SIZE
            )));
        }
        Ok(Self { entry, payload })
    }
}
