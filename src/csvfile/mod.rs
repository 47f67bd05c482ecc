//! Random-access, line-oriented file reading
//!
//! This module knows nothing about CSV semantics beyond "lines separated by a
//! single separator byte". It provides the byte-position primitives the resume
//! resolver is built on:
//!
//! 1. **Data-region bounds**: the first byte of data (past an optional header
//!    line) and the separator terminating the last *complete* line. A trailing
//!    partial line still being appended by the producer is excluded.
//! 2. **Line lookup by byte position**: given any byte offset, find the
//!    boundaries and text of the line containing it.
//! 3. **Bounded chunked line reads**: stream whole lines forward from a byte
//!    offset, holding partial lines back across chunk boundaries.
//!
//! Bounds are computed once at open time and never refreshed, so one open
//! handle is a stable snapshot even while an external producer keeps
//! appending. Callers re-open to observe growth.

pub mod random_access;

pub use random_access::IndexedCsvFile;

/// One complete line located by byte position.
///
/// `end_pos` is the offset of the line's terminating separator; `text` is the
/// line content with the separator excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Byte offset of the first character of the line
    pub start_pos: u64,
    /// Byte offset of the terminating separator
    pub end_pos: u64,
    /// Line content, separator excluded
    pub text: String,
}

/// File access errors
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The file could not be opened or stat'd
    #[error("failed to open {path}: {source}")]
    Open {
        /// Path that failed to open
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A read or seek failed after the file was opened
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    /// The handle was already closed
    #[error("file handle is closed")]
    Closed,
}
