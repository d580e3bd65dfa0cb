//! A single open segment file.

use crate::error::{JournalError, JournalResult};
use crate::segment::codec::{
    encode_record, FileHeader, SegmentKind, FILE_HEADER_SIZE, RECORD_HEADER_SIZE,
};
use crate::types::{LogNumber, RecordId};
use ferrolog_storage::{StorageBackend, StorageError};
use parking_lot::Mutex;
use std::cmp::Ordering;

/// Result of offering a record to a segment.
#[derive(Debug)]
pub enum AppendOutcome {
    /// The record was framed, written, and is durable.
    Written(WrittenRecord),
    /// The record fits a segment of this capacity, but not the space
    /// remaining in this one. No bytes were written.
    SegmentFull,
    /// The record cannot fit a fresh segment of this capacity at all and
    /// needs a dedicated, larger segment. No bytes were written.
    RecordTooLarge,
}

/// Placement of a record that was written to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenRecord {
    /// Id the record was written under.
    pub record_id: RecordId,
    /// Byte offset of the record's header within the segment file.
    pub offset: u64,
    /// Total framed length of the record.
    pub length: u32,
}

/// Exclusive owner of one segment file.
///
/// All writes go through [`SegmentFile::append`], which holds the segment's
/// append lock across the whole frame-then-write so records can never
/// interleave, even if a future caller admits concurrent appenders. The
/// journal engine additionally serializes appends through its directory
/// lock; this lock is the segment's own guarantee.
pub struct SegmentFile {
    file_name: String,
    header: FileHeader,
    /// The append lock. `None` once the segment is closed.
    backend: Mutex<Option<Box<dyn StorageBackend>>>,
}

impl SegmentFile {
    /// Creates a new segment: writes the file header and syncs it.
    ///
    /// The cursor is left at byte 25, ready for the first record.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written or synced.
    pub fn create(
        mut backend: Box<dyn StorageBackend>,
        file_name: impl Into<String>,
        log_number: LogNumber,
        max_size: u32,
        kind: SegmentKind,
    ) -> JournalResult<Self> {
        let header = FileHeader::new(kind, max_size, log_number);
        backend.append(&header.encode())?;
        backend.sync()?;

        Ok(Self {
            file_name: file_name.into(),
            header,
            backend: Mutex::new(Some(backend)),
        })
    }

    /// Opens an existing segment, parsing and validating its header.
    ///
    /// The cursor is at end-of-file; appending resumes past the last fully
    /// written record.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::SegmentCorruption`] if the header is
    /// missing, has bad magic, an unsupported version, or an unknown kind.
    pub fn open_existing(
        backend: Box<dyn StorageBackend>,
        file_name: impl Into<String>,
    ) -> JournalResult<Self> {
        let size = backend.size()?;
        if size < FILE_HEADER_SIZE as u64 {
            return Err(JournalError::segment_corruption(format!(
                "segment shorter than its header: {size} bytes"
            )));
        }

        let header_bytes = backend.read_at(0, FILE_HEADER_SIZE)?;
        let header = FileHeader::decode(&header_bytes)?;

        Ok(Self {
            file_name: file_name.into(),
            header,
            backend: Mutex::new(Some(backend)),
        })
    }

    /// Frames and writes one record under the append lock.
    ///
    /// Capacity is checked before any byte is written: a frame that no
    /// longer fits the remaining space yields [`AppendOutcome::SegmentFull`],
    /// and a frame that could not even fit a fresh segment of this
    /// capacity (header included) yields [`AppendOutcome::RecordTooLarge`].
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is closed or the backend write
    /// fails. A failed write leaves the cursor wherever the backend left
    /// it; callers treat the segment as suspect and roll over.
    pub fn append(
        &self,
        payload: &[u8],
        entry_type: u8,
        record_id: RecordId,
    ) -> JournalResult<AppendOutcome> {
        let mut guard = self.backend.lock();
        let backend = guard
            .as_mut()
            .ok_or(JournalError::Storage(StorageError::Closed))?;

        let framed_len = RECORD_HEADER_SIZE + payload.len();
        let max_size = u64::from(self.header.max_size);

        if (FILE_HEADER_SIZE + framed_len) as u64 > max_size {
            return Ok(AppendOutcome::RecordTooLarge);
        }

        let position = backend.size()?;
        if position + framed_len as u64 > max_size {
            return Ok(AppendOutcome::SegmentFull);
        }

        let frame = encode_record(payload, entry_type, record_id);
        let offset = backend.append(&frame)?;
        tracing::trace!(
            segment = %self.header.log_number,
            record = %record_id,
            offset,
            length = frame.len(),
            "record written"
        );

        Ok(AppendOutcome::Written(WrittenRecord {
            record_id,
            offset,
            length: frame.len() as u32,
        }))
    }

    /// Syncs and releases the file handle. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails; the handle is released
    /// either way.
    pub fn close(&self) -> JournalResult<()> {
        let mut guard = self.backend.lock();
        if let Some(mut backend) = guard.take() {
            backend.sync()?;
        }
        Ok(())
    }

    /// Returns whether the segment has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.backend.lock().is_none()
    }

    /// Returns the current append position (the file size).
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is closed.
    pub fn position(&self) -> JournalResult<u64> {
        let guard = self.backend.lock();
        let backend = guard
            .as_ref()
            .ok_or(JournalError::Storage(StorageError::Closed))?;
        Ok(backend.size()?)
    }

    /// Returns the segment's log number.
    #[must_use]
    pub fn log_number(&self) -> LogNumber {
        self.header.log_number
    }

    /// Returns the segment's kind.
    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        self.header.kind
    }

    /// Returns the segment's capacity ceiling.
    #[must_use]
    pub fn max_size(&self) -> u32 {
        self.header.max_size
    }

    /// Returns the file name the segment was created under.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the parsed file header.
    #[must_use]
    pub fn header(&self) -> FileHeader {
        self.header
    }
}

impl std::fmt::Debug for SegmentFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentFile")
            .field("file_name", &self.file_name)
            .field("header", &self.header)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PartialEq for SegmentFile {
    fn eq(&self, other: &Self) -> bool {
        self.log_number() == other.log_number()
    }
}

impl Eq for SegmentFile {}

impl PartialOrd for SegmentFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SegmentFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.log_number().cmp(&other.log_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::codec::OVERFLOW_OVERHEAD;
    use ferrolog_storage::InMemoryBackend;

    fn new_segment(max_size: u32, kind: SegmentKind) -> SegmentFile {
        SegmentFile::create(
            Box::new(InMemoryBackend::new()),
            "journal-00000000000000000000.log",
            LogNumber::new(0),
            max_size,
            kind,
        )
        .unwrap()
    }

    #[test]
    fn create_positions_cursor_after_header() {
        let segment = new_segment(4096, SegmentKind::Default);
        assert_eq!(segment.position().unwrap(), FILE_HEADER_SIZE as u64);
    }

    #[test]
    fn append_advances_cursor_contiguously() {
        let segment = new_segment(4096, SegmentKind::Default);

        match segment.append(b"A", 1, RecordId::new(1)).unwrap() {
            AppendOutcome::Written(written) => {
                assert_eq!(written.offset, 25);
                assert_eq!(written.length, 18);
            }
            other => panic!("expected written, got {other:?}"),
        }

        match segment.append(b"BB", 1, RecordId::new(2)).unwrap() {
            AppendOutcome::Written(written) => {
                assert_eq!(written.offset, 43);
                assert_eq!(written.length, 19);
            }
            other => panic!("expected written, got {other:?}"),
        }

        assert_eq!(segment.position().unwrap(), 62);
    }

    #[test]
    fn full_segment_reports_segment_full() {
        // Capacity 60: header (25) + one 15-byte-payload record (32) = 57.
        let segment = new_segment(60, SegmentKind::Default);

        assert!(matches!(
            segment.append(&[0u8; 15], 1, RecordId::new(1)).unwrap(),
            AppendOutcome::Written(_)
        ));
        assert!(matches!(
            segment.append(&[0u8; 15], 1, RecordId::new(2)).unwrap(),
            AppendOutcome::SegmentFull
        ));
        // Nothing was written by the refused append.
        assert_eq!(segment.position().unwrap(), 57);
    }

    #[test]
    fn oversize_record_reports_record_too_large() {
        let segment = new_segment(100, SegmentKind::Default);
        assert!(matches!(
            segment.append(&[0u8; 200], 1, RecordId::new(1)).unwrap(),
            AppendOutcome::RecordTooLarge
        ));
        assert_eq!(segment.position().unwrap(), 25);
    }

    #[test]
    fn boundary_record_that_fits_only_an_empty_segment() {
        // Capacity 60 leaves 35 bytes of record space; an 18-byte-payload
        // frame (35 bytes) fills it exactly.
        let segment = new_segment(60, SegmentKind::Default);
        assert!(matches!(
            segment.append(&[0u8; 18], 1, RecordId::new(1)).unwrap(),
            AppendOutcome::Written(_)
        ));
        assert_eq!(segment.position().unwrap(), 60);

        // One byte more cannot fit any segment of this capacity.
        let segment = new_segment(60, SegmentKind::Default);
        assert!(matches!(
            segment.append(&[0u8; 19], 1, RecordId::new(1)).unwrap(),
            AppendOutcome::RecordTooLarge
        ));
    }

    #[test]
    fn overflow_segment_takes_exactly_one_record() {
        let payload = [7u8; 200];
        let max = (payload.len() + OVERFLOW_OVERHEAD) as u32;
        let segment = new_segment(max, SegmentKind::Overflow);

        assert!(matches!(
            segment.append(&payload, 1, RecordId::new(1)).unwrap(),
            AppendOutcome::Written(_)
        ));
        assert_eq!(segment.position().unwrap(), u64::from(max));

        assert!(matches!(
            segment.append(b"x", 1, RecordId::new(2)).unwrap(),
            AppendOutcome::SegmentFull
        ));
    }

    #[test]
    fn close_is_idempotent_and_rejects_appends() {
        let segment = new_segment(4096, SegmentKind::Default);
        segment.close().unwrap();
        segment.close().unwrap();
        assert!(segment.is_closed());

        let result = segment.append(b"x", 1, RecordId::new(1));
        assert!(matches!(
            result,
            Err(JournalError::Storage(StorageError::Closed))
        ));
    }

    #[test]
    fn open_existing_resumes_at_end() {
        let mut backend = InMemoryBackend::new();
        backend
            .append(&FileHeader::new(SegmentKind::Default, 4096, LogNumber::new(3)).encode())
            .unwrap();
        backend
            .append(&encode_record(b"abc", 2, RecordId::new(5)))
            .unwrap();

        let segment = SegmentFile::open_existing(
            Box::new(InMemoryBackend::with_data(backend.data())),
            "journal-00000000000000000003.log",
        )
        .unwrap();

        assert_eq!(segment.log_number(), LogNumber::new(3));
        assert_eq!(segment.kind(), SegmentKind::Default);
        assert_eq!(segment.position().unwrap(), 45);
    }

    #[test]
    fn open_existing_rejects_garbage() {
        let backend = InMemoryBackend::with_data(b"not a segment".to_vec());
        assert!(SegmentFile::open_existing(Box::new(backend), "x").is_err());
    }

    #[test]
    fn segments_order_by_log_number() {
        let a = new_segment(100, SegmentKind::Default);
        let b = SegmentFile::create(
            Box::new(InMemoryBackend::new()),
            "journal-00000000000000000001.log",
            LogNumber::new(1),
            100,
            SegmentKind::Default,
        )
        .unwrap();
        assert!(a < b);
    }
}
