//! Segment file naming.

use crate::error::{JournalError, JournalResult};
use crate::types::LogNumber;

/// Maps log numbers to segment file names and back.
///
/// For every implementation, `extract_log_number(&generate(n))` must
/// return `n` and `is_journal(&generate(n))` must return `true`.
pub trait NamingStrategy: Send + Sync {
    /// Produces the file name for a segment.
    fn generate(&self, log_number: LogNumber) -> String;

    /// Returns whether `name` looks like a segment of this journal.
    fn is_journal(&self, name: &str) -> bool;

    /// Extracts the log number from a segment file name.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a name this strategy generated.
    fn extract_log_number(&self, name: &str) -> JournalResult<LogNumber>;
}

/// Width of the zero-padded log number in generated file names.
const NUMBER_WIDTH: usize = 20;

/// The default naming strategy: `<prefix>-<zero-padded number>.log`.
///
/// The number is padded to 20 digits so lexicographic and numeric order
/// agree for every `u64`.
#[derive(Debug, Clone)]
pub struct PrefixNaming {
    prefix: String,
}

impl PrefixNaming {
    /// Creates a strategy with the given file-name prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for PrefixNaming {
    fn default() -> Self {
        Self::new("journal")
    }
}

impl NamingStrategy for PrefixNaming {
    fn generate(&self, log_number: LogNumber) -> String {
        format!(
            "{}-{:0width$}.log",
            self.prefix,
            log_number.as_u64(),
            width = NUMBER_WIDTH
        )
    }

    fn is_journal(&self, name: &str) -> bool {
        self.extract_log_number(name).is_ok()
    }

    fn extract_log_number(&self, name: &str) -> JournalResult<LogNumber> {
        let rest = name
            .strip_prefix(self.prefix.as_str())
            .and_then(|s| s.strip_prefix('-'))
            .and_then(|s| s.strip_suffix(".log"))
            .ok_or_else(|| {
                JournalError::configuration(format!("not a journal file name: {name}"))
            })?;

        if rest.len() != NUMBER_WIDTH || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(JournalError::configuration(format!(
                "not a journal file name: {name}"
            )));
        }

        let number = rest.parse::<u64>().map_err(|_| {
            JournalError::configuration(format!("log number out of range in: {name}"))
        })?;

        Ok(LogNumber::new(number))
    }
}
