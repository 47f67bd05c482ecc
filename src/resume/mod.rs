//! Resume-point resolution.
//!
//! Given an open [`IndexedCsvFile`], a [`FieldLayout`], and the remote
//! store's high-water-mark timestamp, compute the byte position at which the
//! next upload should start reading, or signal that nothing needs uploading.
//!
//! The resolver never scans the whole file: it compares the high-water mark
//! against the first and last records, then binary searches byte positions in
//! between. On an exact timestamp match it resumes just past the matched line
//! (that record is already stored); otherwise it resumes at the start of the
//! line containing the insertion point.

pub mod search;

use std::cmp::Ordering;
use tracing::{debug, trace};

use crate::csvfile::{FileError, IndexedCsvFile};
use crate::layout::{FieldLayout, LayoutError};
use search::{search_byte_range, SearchOutcome};

/// Where the next upload cycle should begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePosition {
    /// Start reading at this byte offset
    StartAt(u64),
    /// Everything in the file is already stored (or the file has no data)
    NothingToDo,
}

/// Errors raised while resolving the resume position
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// File access failed mid-resolution
    #[error(transparent)]
    File(#[from] FileError),

    /// A probed line did not match the configured layout
    #[error("malformed line during resume: {0}")]
    MalformedLine(#[from] LayoutError),

    /// A probed byte position resolved to no complete line
    #[error("no complete line contains byte position {0}")]
    UnresolvedPosition(u64),
}

/// Resolve the byte position at which upload should resume.
///
/// `remote_max_timestamp` is `None` when the store holds no prior data, in
/// which case the whole data region is uploaded.
pub fn resolve_resume_position(
    file: &IndexedCsvFile,
    layout: &FieldLayout,
    remote_max_timestamp: Option<f64>,
) -> Result<ResumePosition, ResumeError> {
    let (min_pos, max_pos) = match file.data_region() {
        Some(region) => region,
        None => {
            debug!("file has no complete data lines; nothing to do");
            return Ok(ResumePosition::NothingToDo);
        }
    };

    let high_water = match remote_max_timestamp {
        Some(ts) => ts,
        None => {
            debug!(start = min_pos, "store holds no prior data; uploading whole file");
            return Ok(ResumePosition::StartAt(min_pos));
        }
    };

    let first = require_line(file, min_pos)?;
    let last = require_line(file, max_pos)?;
    let first_ts = layout.timestamp_of(&first.text)?;
    let last_ts = layout.timestamp_of(&last.text)?;

    if high_water < first_ts {
        debug!(high_water, first_ts, "entire file is newer than the store");
        return Ok(ResumePosition::StartAt(min_pos));
    }
    if high_water >= last_ts {
        debug!(high_water, last_ts, "entire file is already stored; nothing to do");
        return Ok(ResumePosition::NothingToDo);
    }

    let outcome = search_byte_range(min_pos, max_pos, |pos| {
        let line = require_line(file, pos)?;
        let ts = layout.timestamp_of(&line.text)?;
        trace!(pos, ts, high_water, "resume probe");
        // NaN timestamps are rejected by the layout, so ordering is total here.
        Ok::<Ordering, ResumeError>(
            ts.partial_cmp(&high_water).unwrap_or(Ordering::Greater),
        )
    })?;

    let start = match outcome {
        SearchOutcome::Found(pos) => {
            // The matched line is already stored; skip past its separator.
            let line = require_line(file, pos)?;
            trace!(pos = line.end_pos + 1, "high-water mark found in file");
            line.end_pos + 1
        }
        SearchOutcome::InsertAt(pos) => {
            if pos > max_pos {
                return Ok(ResumePosition::NothingToDo);
            }
            // Resume at the start of the line containing the insertion point.
            let line = require_line(file, pos)?;
            trace!(pos = line.start_pos, "high-water mark not in file");
            line.start_pos
        }
    };

    if start >= max_pos {
        return Ok(ResumePosition::NothingToDo);
    }
    Ok(ResumePosition::StartAt(start))
}

fn require_line(
    file: &IndexedCsvFile,
    pos: u64,
) -> Result<crate::csvfile::LineRecord, ResumeError> {
    file.line_containing(pos)?
        .ok_or(ResumeError::UnresolvedPosition(pos))
}
