//! Segment files and their on-disk format.
//!
//! A journal is a directory of segment files. Each segment holds one
//! 25-byte file header followed by a run of contiguous framed records:
//!
//! ```text
//! file header (25):   | magic (4) | version (2) | kind (1) | max_size (4) |
//!                     | log_number (8) | reserved (6) |
//! record header (17): | length (4) | type (1) | record_id (8) | reserved (4) |
//! ```
//!
//! All multi-byte integers are big-endian. `length` counts the record
//! header itself plus the payload, so a decoder can walk a segment from
//! byte 25 with nothing but the headers.
//!
//! - `codec`: pure framing and unframing of headers and records
//! - `file`: one open segment and its serialized append operation
//! - `directory`: the ordered set of segments belonging to one journal

pub mod codec;
pub mod directory;
pub mod file;

pub use codec::{
    Decoded, FileHeader, RecordHeader, SegmentKind, FILE_HEADER_SIZE, JOURNAL_MAGIC,
    JOURNAL_VERSION, OVERFLOW_OVERHEAD, RECORD_HEADER_SIZE,
};
pub use directory::SegmentDirectory;
pub use file::{AppendOutcome, SegmentFile, WrittenRecord};
