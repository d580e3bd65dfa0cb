//! CLI command implementations.

pub mod dump;
pub mod inspect;

use ferrolog_core::{LogNumber, NamingStrategy, PrefixNaming};
use std::path::{Path, PathBuf};

/// Segment files of a journal directory, sorted by log number.
pub fn segment_files(
    path: &Path,
    prefix: &str,
) -> Result<Vec<(LogNumber, String, PathBuf)>, Box<dyn std::error::Error>> {
    let naming = PrefixNaming::new(prefix);
    let mut files = Vec::new();

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if naming.is_journal(&name) {
            let log_number = naming.extract_log_number(&name)?;
            files.push((log_number, name, entry.path()));
        }
    }

    files.sort_by_key(|(log_number, _, _)| *log_number);
    Ok(files)
}
