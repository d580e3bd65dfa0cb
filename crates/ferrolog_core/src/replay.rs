//! Startup replay of existing segments.
//!
//! Replay runs once inside `Journal::open`, before the writer thread is
//! started and before any segment is opened for appending. It walks the
//! journal directory in log-number order, re-emits every decodable record
//! through the listener's `on_replay` hook, and restores the id
//! generator's high-water mark.
//!
//! ## Tolerated vs fatal conditions
//!
//! A truncated or corrupt *tail* is what a crash mid-append leaves behind:
//! replay of that segment stops at the first unreadable byte, the file is
//! kept intact, and later segments still replay. A file whose *header*
//! cannot be validated - bad magic, unsupported version, too short - is a
//! different matter: the journal cannot establish its invariants over it,
//! so startup fails.

use crate::entry::EntryReader;
use crate::error::{JournalError, JournalResult};
use crate::journal::BackendFactory;
use crate::listener::JournalListener;
use crate::naming::NamingStrategy;
use crate::record::JournalRecord;
use crate::segment::codec::{self, Decoded, FILE_HEADER_SIZE};
use crate::segment::directory::SegmentDirectory;
use crate::segment::file::SegmentFile;
use crate::types::{LogNumber, RecordId};
use std::path::Path;

/// What a replay pass found.
#[derive(Debug, Default)]
pub(crate) struct ReplaySummary {
    /// Number of segment files replayed.
    pub segments: usize,
    /// Number of records re-emitted.
    pub records: u64,
    /// Highest record id seen, if any record was emitted.
    pub max_record_id: Option<RecordId>,
}

/// Replays every journal file under `journal_path` into `listener` and
/// pushes the segments into `directory` as closed history.
pub(crate) fn replay_into<V>(
    journal_path: &Path,
    naming: &dyn NamingStrategy,
    backend_factory: &BackendFactory,
    entry_reader: &dyn EntryReader<V>,
    listener: &dyn JournalListener<V>,
    directory: &mut SegmentDirectory,
) -> JournalResult<ReplaySummary> {
    let mut files: Vec<(LogNumber, String)> = Vec::new();
    for dir_entry in std::fs::read_dir(journal_path)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }
        let name = dir_entry.file_name().to_string_lossy().into_owned();
        if naming.is_journal(&name) {
            let log_number = naming.extract_log_number(&name)?;
            files.push((log_number, name));
        }
    }

    if files.is_empty() {
        return Ok(ReplaySummary::default());
    }

    files.sort_by_key(|(log_number, _)| *log_number);
    tracing::warn!(
        path = %journal_path.display(),
        segments = files.len(),
        "found existing journal segments, starting replay"
    );

    let mut summary = ReplaySummary::default();

    for (log_number, name) in files {
        let path = journal_path.join(&name);
        let backend = (backend_factory)(&path)?;

        summary.records += replay_segment(
            &name,
            &*backend,
            entry_reader,
            listener,
            &mut summary.max_record_id,
        )?;
        summary.segments += 1;

        let segment = SegmentFile::open_existing(backend, name.clone())
            .map_err(|err| JournalError::replay(format!("segment {name}: {err}")))?;
        if segment.log_number() != log_number {
            return Err(JournalError::replay(format!(
                "segment {name} carries log number {} but is named for {log_number}",
                segment.log_number()
            )));
        }
        segment.close()?;
        directory.push_head(segment)?;
    }

    tracing::info!(
        segments = summary.segments,
        records = summary.records,
        "replay complete"
    );
    Ok(summary)
}

/// Re-emits the records of one segment; returns how many were emitted.
fn replay_segment<V>(
    name: &str,
    backend: &dyn ferrolog_storage::StorageBackend,
    entry_reader: &dyn EntryReader<V>,
    listener: &dyn JournalListener<V>,
    max_record_id: &mut Option<RecordId>,
) -> JournalResult<u64> {
    let header_bytes = backend
        .read_at(0, FILE_HEADER_SIZE)
        .map_err(|err| JournalError::replay(format!("segment {name}: unreadable header: {err}")))?;
    codec::FileHeader::decode(&header_bytes)
        .map_err(|err| JournalError::replay(format!("segment {name}: {err}")))?;

    let mut offset = FILE_HEADER_SIZE as u64;
    let mut emitted = 0u64;

    loop {
        match codec::read_record(backend, offset)? {
            Decoded::Record { header, payload } => {
                let entry = entry_reader
                    .read_entry(&payload, header.entry_type)
                    .map_err(|err| {
                        JournalError::replay(format!(
                            "segment {name}: record {} failed to decode: {err}",
                            header.record_id
                        ))
                    })?;
                let record = JournalRecord::new(header.record_id, entry);
                listener.on_replay(&record);

                *max_record_id = Some(match *max_record_id {
                    Some(max) if max >= header.record_id => max,
                    _ => header.record_id,
                });
                emitted += 1;
                offset += u64::from(header.length);
            }
            Decoded::EndOfSegment => {
                let size = backend.size()?;
                if offset < size {
                    tracing::warn!(
                        segment = name,
                        offset,
                        size,
                        "truncated record header at segment tail, ignoring remainder"
                    );
                }
                break;
            }
            Decoded::Corrupt { reason } => {
                tracing::warn!(
                    segment = name,
                    offset,
                    reason = %reason,
                    "unreadable record at segment tail, ignoring remainder"
                );
                break;
            }
        }
    }

    Ok(emitted)
}
