//! Error types for the journal engine.

use std::io;
use thiserror::Error;

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors that can occur in journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] ferrolog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The entry writer failed before any I/O happened.
    #[error("entry encoding failed: {message}")]
    Encoding {
        /// Description of the failure.
        message: String,
    },

    /// A segment file is corrupted or has an invalid format.
    #[error("segment corruption: {message}")]
    SegmentCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Replay could not establish the journal's initial state.
    #[error("replay failed: {message}")]
    Replay {
        /// Description of the failure.
        message: String,
    },

    /// An append could not be completed even after rollover.
    #[error("append failed: {message}")]
    AppendFailed {
        /// Description of the failure.
        message: String,
    },

    /// The journal is closed.
    #[error("journal is closed")]
    Closed,
}

impl JournalError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a segment corruption error.
    pub fn segment_corruption(message: impl Into<String>) -> Self {
        Self::SegmentCorruption {
            message: message.into(),
        }
    }

    /// Creates a replay error.
    pub fn replay(message: impl Into<String>) -> Self {
        Self::Replay {
            message: message.into(),
        }
    }

    /// Creates an append failure error.
    pub fn append_failed(message: impl Into<String>) -> Self {
        Self::AppendFailed {
            message: message.into(),
        }
    }
}
