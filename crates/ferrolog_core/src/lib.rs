//! # ferrolog Core
//!
//! A durable, append-only journal engine for values of an
//! application-defined type `V`.
//!
//! This crate provides:
//! - Segmented on-disk storage with a fixed binary record framing
//! - Synchronous and asynchronous append paths with automatic segment
//!   rollover and oversize-record handling
//! - Atomic batch commits into dedicated, exactly-sized segments
//! - Startup replay that reconstructs application state and restores the
//!   record-id high-water mark
//!
//! The engine treats `V` opaquely: applications plug in an
//! [`EntryWriter`]/[`EntryReader`] pair for serialization, a
//! [`JournalListener`] for commit/replay/failure notifications, and may
//! override record-id generation and file naming.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use ferrolog_core::*;
//! # struct Codec;
//! # impl EntryWriter<Vec<u8>> for Codec {
//! #     fn write_entry(&self, e: &JournalEntry<Vec<u8>>, out: &mut Vec<u8>) -> JournalResult<()> {
//! #         out.extend_from_slice(e.value());
//! #         Ok(())
//! #     }
//! # }
//! # impl EntryReader<Vec<u8>> for Codec {
//! #     fn read_entry(&self, p: &[u8], t: u8) -> JournalResult<JournalEntry<Vec<u8>>> {
//! #         Ok(JournalEntry::new(p.to_vec(), t))
//! #     }
//! # }
//! # struct Quiet;
//! # impl JournalListener<Vec<u8>> for Quiet {
//! #     fn on_commit(&self, _: &JournalRecord<Vec<u8>>) {}
//! #     fn on_failure(&self, _: FailureContext<'_, Vec<u8>>, _: &JournalError) {}
//! # }
//! # fn main() -> JournalResult<()> {
//! let journal = Journal::builder("/var/lib/myapp/journal")
//!     .config(JournalConfig::new().name("myapp").max_segment_size(4 * 1024 * 1024))
//!     .entry_writer(Arc::new(Codec))
//!     .entry_reader(Arc::new(Codec))
//!     .listener(Arc::new(Quiet))
//!     .open()?;
//!
//! journal.append_sync(JournalEntry::new(b"hello".to_vec(), 1))?;
//! journal.close()?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod config;
mod entry;
mod error;
mod idgen;
mod journal;
mod listener;
mod naming;
mod record;
mod replay;
pub mod segment;
mod types;
mod writer;

pub use batch::JournalBatch;
pub use config::JournalConfig;
pub use entry::{EntryReader, EntryWriter, JournalEntry};
pub use error::{JournalError, JournalResult};
pub use idgen::{RecordIdGenerator, SequentialIdGenerator};
pub use journal::{BackendFactory, Journal, JournalBuilder};
pub use listener::{FailureContext, JournalListener};
pub use naming::{NamingStrategy, PrefixNaming};
pub use record::JournalRecord;
pub use types::{LogNumber, RecordId};
