//! Row-oriented text sources local items are materialized from.
//!
//! A [`Source`] returns the text of the data row at a zero based index, the header row is never
//! counted. Reads are serialized through a single [`SourceReader`] unit.

mod base;
mod file;
mod memory;
mod reader;

pub use base::Source;
pub use file::FileSource;
pub use memory::MemorySource;
pub use reader::{SourceReader, SourceReaderWorker};
