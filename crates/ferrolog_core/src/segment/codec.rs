//! Record and file-header framing.
//!
//! Everything in this module is pure: encoding builds byte vectors,
//! decoding reads from a [`StorageBackend`] without touching segment
//! state. Segment bookkeeping lives in [`super::file`].

use crate::error::{JournalError, JournalResult};
use crate::types::{LogNumber, RecordId};
use ferrolog_storage::StorageBackend;

/// Magic bytes identifying a segment file.
pub const JOURNAL_MAGIC: [u8; 4] = *b"FLOG";

/// Current segment format version.
pub const JOURNAL_VERSION: u16 = 1;

/// Size of the file header in bytes.
///
/// magic (4) + version (2) + kind (1) + max_size (4) + log_number (8) +
/// reserved (6) = 25. Part of the format; must not change.
pub const FILE_HEADER_SIZE: usize = 25;

/// Size of a record header in bytes.
///
/// length (4) + type (1) + record_id (8) + reserved (4) = 17. Part of the
/// format; must not change.
pub const RECORD_HEADER_SIZE: usize = 17;

/// Fixed overhead of a segment holding exactly one record.
///
/// Used to size an overflow segment for a single oversize record.
pub const OVERFLOW_OVERHEAD: usize = FILE_HEADER_SIZE + RECORD_HEADER_SIZE;

/// What kind of records a segment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentKind {
    /// A regular segment bounded by the configured maximum size.
    Default = 1,
    /// A segment holding exactly one record too large for a default
    /// segment, sized exactly for it.
    Overflow = 2,
    /// A segment holding exactly the records of one atomic batch, sized
    /// exactly for them.
    Batch = 3,
}

impl SegmentKind {
    /// Converts a byte to a segment kind.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Default),
            2 => Some(Self::Overflow),
            3 => Some(Self::Batch),
            _ => None,
        }
    }

    /// Converts the kind to its on-disk byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// The parsed 25-byte header at the start of every segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version the segment was written with.
    pub version: u16,
    /// Kind of segment.
    pub kind: SegmentKind,
    /// Capacity ceiling of the segment, including this header.
    pub max_size: u32,
    /// Position of the segment in the journal's segment sequence.
    pub log_number: LogNumber,
}

impl FileHeader {
    /// Creates a header for a new segment.
    #[must_use]
    pub fn new(kind: SegmentKind, max_size: u32, log_number: LogNumber) -> Self {
        Self {
            version: JOURNAL_VERSION,
            kind,
            max_size,
            log_number,
        }
    }

    /// Encodes the header into its 25-byte on-disk form.
    #[must_use]
    pub fn encode(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[0..4].copy_from_slice(&JOURNAL_MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_be_bytes());
        buf[6] = self.kind.as_byte();
        buf[7..11].copy_from_slice(&self.max_size.to_be_bytes());
        buf[11..19].copy_from_slice(&self.log_number.as_u64().to_be_bytes());
        // buf[19..25] reserved, zero
        buf
    }

    /// Decodes and validates a header from its on-disk form.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::SegmentCorruption`] on a short buffer, bad
    /// magic, unsupported version, or unknown kind byte.
    pub fn decode(bytes: &[u8]) -> JournalResult<Self> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(JournalError::segment_corruption(format!(
                "file header truncated: {} of {FILE_HEADER_SIZE} bytes",
                bytes.len()
            )));
        }

        if bytes[0..4] != JOURNAL_MAGIC {
            return Err(JournalError::segment_corruption("bad magic"));
        }

        let version = u16::from_be_bytes([bytes[4], bytes[5]]);
        if version != JOURNAL_VERSION {
            return Err(JournalError::segment_corruption(format!(
                "unsupported format version {version}"
            )));
        }

        let kind = SegmentKind::from_byte(bytes[6]).ok_or_else(|| {
            JournalError::segment_corruption(format!("unknown segment kind {}", bytes[6]))
        })?;

        let max_size = u32::from_be_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]);
        let log_number = LogNumber::new(u64::from_be_bytes([
            bytes[11], bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18],
        ]));

        Ok(Self {
            version,
            kind,
            max_size,
            log_number,
        })
    }
}

/// The parsed 17-byte header in front of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Total framed length: this header plus the payload.
    pub length: u32,
    /// Application-defined type tag of the entry.
    pub entry_type: u8,
    /// Id assigned to the record when it was appended.
    pub record_id: RecordId,
}

impl RecordHeader {
    fn decode(bytes: &[u8; RECORD_HEADER_SIZE]) -> Self {
        let length = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let entry_type = bytes[4];
        let record_id = RecordId::new(u64::from_be_bytes([
            bytes[5], bytes[6], bytes[7], bytes[8], bytes[9], bytes[10], bytes[11], bytes[12],
        ]));
        // bytes[13..17] reserved
        Self {
            length,
            entry_type,
            record_id,
        }
    }
}

/// Frames a payload into a complete record.
///
/// The result is `RECORD_HEADER_SIZE + payload.len()` bytes and is written
/// to a segment in a single backend append.
#[must_use]
pub fn encode_record(payload: &[u8], entry_type: u8, record_id: RecordId) -> Vec<u8> {
    let length = (RECORD_HEADER_SIZE + payload.len()) as u32;
    let mut buf = Vec::with_capacity(length as usize);
    buf.extend_from_slice(&length.to_be_bytes());
    buf.push(entry_type);
    buf.extend_from_slice(&record_id.as_u64().to_be_bytes());
    buf.extend_from_slice(&[0u8; 4]); // reserved
    buf.extend_from_slice(payload);
    buf
}

/// Outcome of decoding one record from a segment.
#[derive(Debug)]
pub enum Decoded {
    /// A complete record.
    Record {
        /// The parsed record header.
        header: RecordHeader,
        /// The payload bytes following the header.
        payload: Vec<u8>,
    },
    /// Fewer than [`RECORD_HEADER_SIZE`] bytes remain at the offset; the
    /// rest of the segment is a truncated tail.
    EndOfSegment,
    /// The bytes at the offset do not frame a record.
    Corrupt {
        /// Human-readable description of what was wrong.
        reason: String,
    },
}

/// Decodes the record starting at `offset`.
///
/// Reading stops at the backend's current size: a cut-off record header
/// yields [`Decoded::EndOfSegment`], an impossible or overrunning length
/// yields [`Decoded::Corrupt`].
///
/// # Errors
///
/// Returns an error only for backend I/O failures; malformed data is
/// reported through the [`Decoded`] variants.
pub fn read_record(backend: &dyn StorageBackend, offset: u64) -> JournalResult<Decoded> {
    let end = backend.size()?;

    if offset + RECORD_HEADER_SIZE as u64 > end {
        return Ok(Decoded::EndOfSegment);
    }

    let header_bytes = backend.read_at(offset, RECORD_HEADER_SIZE)?;
    let mut fixed = [0u8; RECORD_HEADER_SIZE];
    fixed.copy_from_slice(&header_bytes);
    let header = RecordHeader::decode(&fixed);

    if (header.length as usize) < RECORD_HEADER_SIZE {
        return Ok(Decoded::Corrupt {
            reason: format!("record length {} below header size", header.length),
        });
    }

    if offset + u64::from(header.length) > end {
        return Ok(Decoded::Corrupt {
            reason: format!(
                "record length {} overruns segment end {end} at offset {offset}",
                header.length
            ),
        });
    }

    let payload_len = header.length as usize - RECORD_HEADER_SIZE;
    let payload = backend.read_at(offset + RECORD_HEADER_SIZE as u64, payload_len)?;

    Ok(Decoded::Record { header, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrolog_storage::InMemoryBackend;
    use proptest::prelude::*;

    #[test]
    fn kind_byte_roundtrip() {
        for kind in [SegmentKind::Default, SegmentKind::Overflow, SegmentKind::Batch] {
            assert_eq!(SegmentKind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(SegmentKind::from_byte(0), None);
        assert_eq!(SegmentKind::from_byte(4), None);
    }

    #[test]
    fn file_header_roundtrip() {
        let header = FileHeader::new(SegmentKind::Batch, 4096, LogNumber::new(17));
        let bytes = header.encode();
        assert_eq!(bytes.len(), FILE_HEADER_SIZE);
        assert_eq!(FileHeader::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn file_header_rejects_bad_magic() {
        let mut bytes = FileHeader::new(SegmentKind::Default, 100, LogNumber::new(0)).encode();
        bytes[0] = b'X';
        assert!(matches!(
            FileHeader::decode(&bytes),
            Err(JournalError::SegmentCorruption { .. })
        ));
    }

    #[test]
    fn file_header_rejects_future_version() {
        let mut bytes = FileHeader::new(SegmentKind::Default, 100, LogNumber::new(0)).encode();
        bytes[5] = 99;
        assert!(FileHeader::decode(&bytes).is_err());
    }

    #[test]
    fn file_header_rejects_truncation() {
        let bytes = FileHeader::new(SegmentKind::Default, 100, LogNumber::new(0)).encode();
        assert!(FileHeader::decode(&bytes[..10]).is_err());
    }

    #[test]
    fn record_frame_layout() {
        let frame = encode_record(b"abc", 7, RecordId::new(9));
        assert_eq!(frame.len(), RECORD_HEADER_SIZE + 3);
        // length field counts header + payload
        assert_eq!(u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]), 20);
        assert_eq!(frame[4], 7);
        assert_eq!(&frame[RECORD_HEADER_SIZE..], b"abc");
    }

    #[test]
    fn read_record_roundtrip() {
        let mut backend = InMemoryBackend::new();
        backend
            .append(&encode_record(b"payload", 3, RecordId::new(11)))
            .unwrap();

        match read_record(&backend, 0).unwrap() {
            Decoded::Record { header, payload } => {
                assert_eq!(header.entry_type, 3);
                assert_eq!(header.record_id, RecordId::new(11));
                assert_eq!(header.length as usize, RECORD_HEADER_SIZE + 7);
                assert_eq!(payload, b"payload");
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn truncated_header_is_end_of_segment() {
        let mut backend = InMemoryBackend::new();
        backend.append(&[0u8; RECORD_HEADER_SIZE - 1]).unwrap();
        assert!(matches!(
            read_record(&backend, 0).unwrap(),
            Decoded::EndOfSegment
        ));
    }

    #[test]
    fn undersized_length_is_corrupt() {
        let mut backend = InMemoryBackend::new();
        let mut frame = encode_record(b"abc", 1, RecordId::new(1));
        frame[0..4].copy_from_slice(&5u32.to_be_bytes());
        backend.append(&frame).unwrap();
        assert!(matches!(
            read_record(&backend, 0).unwrap(),
            Decoded::Corrupt { .. }
        ));
    }

    #[test]
    fn overrunning_length_is_corrupt() {
        let mut backend = InMemoryBackend::new();
        let frame = encode_record(b"abcdef", 1, RecordId::new(1));
        // Keep the full header but cut the payload short.
        backend.append(&frame[..RECORD_HEADER_SIZE + 2]).unwrap();
        assert!(matches!(
            read_record(&backend, 0).unwrap(),
            Decoded::Corrupt { .. }
        ));
    }

    proptest! {
        #[test]
        fn frame_roundtrip(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            entry_type in any::<u8>(),
            id in any::<u64>(),
        ) {
            let mut backend = InMemoryBackend::new();
            backend.append(&encode_record(&payload, entry_type, RecordId::new(id))).unwrap();

            match read_record(&backend, 0).unwrap() {
                Decoded::Record { header, payload: decoded } => {
                    prop_assert_eq!(header.entry_type, entry_type);
                    prop_assert_eq!(header.record_id, RecordId::new(id));
                    prop_assert_eq!(header.length as usize, RECORD_HEADER_SIZE + payload.len());
                    prop_assert_eq!(decoded, payload);
                }
                other => prop_assert!(false, "expected record, got {:?}", other),
            }
        }
    }
}
