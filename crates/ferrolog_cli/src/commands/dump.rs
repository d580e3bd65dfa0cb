//! Dump command implementation.

use ferrolog_core::segment::codec::{self, Decoded, FILE_HEADER_SIZE, RECORD_HEADER_SIZE};
use ferrolog_storage::FileBackend;
use serde::Serialize;
use std::path::Path;

/// One dumped record.
#[derive(Debug, Serialize)]
pub struct DumpedRecord {
    /// Segment file the record lives in.
    pub segment: String,
    /// Byte offset of the record header within the segment.
    pub offset: u64,
    /// The record id.
    pub record_id: u64,
    /// The application type tag.
    pub entry_type: u8,
    /// Payload length in bytes.
    pub payload_len: u32,
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    prefix: &str,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = super::segment_files(path, prefix)?;
    if files.is_empty() {
        return Err(format!("No journal segments found at {path:?}").into());
    }

    let limit = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();

    'outer: for (_, file_name, file_path) in files {
        let backend = FileBackend::open(&file_path)?;
        let mut offset = FILE_HEADER_SIZE as u64;

        loop {
            match codec::read_record(&backend, offset)? {
                Decoded::Record { header, .. } => {
                    records.push(DumpedRecord {
                        segment: file_name.clone(),
                        offset,
                        record_id: header.record_id.as_u64(),
                        entry_type: header.entry_type,
                        payload_len: header.length - RECORD_HEADER_SIZE as u32,
                    });
                    if records.len() >= limit {
                        break 'outer;
                    }
                    offset += u64::from(header.length);
                }
                Decoded::EndOfSegment | Decoded::Corrupt { .. } => break,
            }
        }
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => {
            for record in &records {
                println!(
                    "{} @{:<8} id={} type={} payload={}B",
                    record.segment, record.offset, record.record_id, record.entry_type,
                    record.payload_len
                );
            }
            println!("{} record(s)", records.len());
        }
    }

    Ok(())
}
