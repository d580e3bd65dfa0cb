//! The ordered set of segments belonging to one journal.

use crate::error::{JournalError, JournalResult};
use crate::segment::file::SegmentFile;
use crate::types::LogNumber;
use std::collections::VecDeque;

/// Segments of a journal, most recent first.
///
/// Only the head segment accepts appends; everything behind it is closed
/// history (rolled-over segments and, after startup, replayed ones). The
/// directory itself is not locked - every structural mutation happens
/// under the journal's directory mutex, and shutdown iteration runs after
/// the writer thread has drained.
#[derive(Debug, Default)]
pub struct SegmentDirectory {
    /// Head at the front.
    segments: VecDeque<SegmentFile>,
}

impl SegmentDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a newly opened segment as the head.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment's log number does not strictly
    /// exceed the current head's.
    pub fn push_head(&mut self, segment: SegmentFile) -> JournalResult<()> {
        if let Some(head) = self.segments.front() {
            if segment.log_number() <= head.log_number() {
                return Err(JournalError::append_failed(format!(
                    "segment {} does not advance past head {}",
                    segment.log_number(),
                    head.log_number()
                )));
            }
        }
        self.segments.push_front(segment);
        Ok(())
    }

    /// Removes and returns the head segment.
    ///
    /// Used only by batch rollback, which discards the batch segment it
    /// pushed moments earlier.
    pub fn pop_head(&mut self) -> Option<SegmentFile> {
        self.segments.pop_front()
    }

    /// Returns the segment currently accepting appends.
    #[must_use]
    pub fn head(&self) -> Option<&SegmentFile> {
        self.segments.front()
    }

    /// Iterates segments from oldest to newest.
    pub fn iter_oldest_to_newest(&self) -> impl Iterator<Item = &SegmentFile> {
        self.segments.iter().rev()
    }

    /// Returns the log number the next segment should be created with:
    /// the head's number plus one, or zero for an empty directory.
    #[must_use]
    pub fn next_log_number(&self) -> LogNumber {
        self.segments
            .front()
            .map_or(LogNumber::new(0), |head| head.log_number().next())
    }

    /// Returns the number of segments tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns whether the directory tracks no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
