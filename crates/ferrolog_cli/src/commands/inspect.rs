//! Inspect command implementation.

use ferrolog_core::segment::codec::{self, Decoded, FileHeader, SegmentKind, FILE_HEADER_SIZE};
use ferrolog_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::path::Path;

/// Journal inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Journal directory path.
    pub path: String,
    /// Number of segment files.
    pub segment_count: usize,
    /// Total size of all segments in bytes.
    pub total_size: u64,
    /// Total number of decodable records.
    pub record_count: u64,
    /// Per-segment details.
    pub segments: Vec<SegmentSummary>,
}

/// Details of a single segment file.
#[derive(Debug, Serialize)]
pub struct SegmentSummary {
    /// File name within the journal directory.
    pub file_name: String,
    /// Log number from the file header.
    pub log_number: u64,
    /// Segment kind (default, overflow, batch).
    pub kind: String,
    /// Capacity ceiling from the file header.
    pub max_size: u32,
    /// Actual file size in bytes.
    pub size: u64,
    /// Number of decodable records.
    pub record_count: u64,
    /// Whether decoding reached the end of the file cleanly.
    pub clean_tail: bool,
}

fn kind_name(kind: SegmentKind) -> &'static str {
    match kind {
        SegmentKind::Default => "default",
        SegmentKind::Overflow => "overflow",
        SegmentKind::Batch => "batch",
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, prefix: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let files = super::segment_files(path, prefix)?;
    if files.is_empty() {
        return Err(format!("No journal segments found at {path:?}").into());
    }

    let mut result = InspectResult {
        path: path.display().to_string(),
        segment_count: files.len(),
        total_size: 0,
        record_count: 0,
        segments: Vec::new(),
    };

    for (_, file_name, file_path) in files {
        let backend = FileBackend::open(&file_path)?;
        let size = backend.size()?;
        let header = FileHeader::decode(&backend.read_at(0, FILE_HEADER_SIZE)?)?;

        let (record_count, clean_tail) = count_records(&backend)?;

        result.total_size += size;
        result.record_count += record_count;
        result.segments.push(SegmentSummary {
            file_name,
            log_number: header.log_number.as_u64(),
            kind: kind_name(header.kind).to_string(),
            max_size: header.max_size,
            size,
            record_count,
            clean_tail,
        });
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }

    Ok(())
}

/// Walks a segment's records; returns the count and whether the tail was
/// clean.
fn count_records(backend: &dyn StorageBackend) -> Result<(u64, bool), Box<dyn std::error::Error>> {
    let size = backend.size()?;
    let mut offset = FILE_HEADER_SIZE as u64;
    let mut count = 0u64;

    loop {
        match codec::read_record(backend, offset)? {
            Decoded::Record { header, .. } => {
                count += 1;
                offset += u64::from(header.length);
            }
            Decoded::EndOfSegment => return Ok((count, offset == size)),
            Decoded::Corrupt { .. } => return Ok((count, false)),
        }
    }
}

fn print_text_output(result: &InspectResult) {
    println!("Journal Inspection");
    println!("==================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Segments: {}", result.segment_count);
    println!("Records:  {}", result.record_count);
    println!("Size:     {} bytes", result.total_size);
    println!();
    for segment in &result.segments {
        println!(
            "  [{}] {} kind={} records={} size={}/{}{}",
            segment.log_number,
            segment.file_name,
            segment.kind,
            segment.record_count,
            segment.size,
            segment.max_size,
            if segment.clean_tail { "" } else { " (truncated tail)" }
        );
    }
}
