//! Line-indexed random access over a flat file.
//!
//! Boundary scans are buffered (512-byte windows) rather than byte-at-a-time;
//! the boundary semantics are identical, the worst-case scan is proportional
//! to one line's length, which is assumed bounded.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{FileError, LineRecord};

/// Window size for backward/forward separator scans.
const SCAN_WINDOW: usize = 512;

/// Chunk size for sequential line reads.
const READ_CHUNK: usize = 4096;

/// A file opened for random byte access with line-boundary lookups.
///
/// The data-region bounds (`min_byte_position`, `max_byte_position`) are
/// computed once at open time and are deliberately not refreshed, so each
/// open handle works against a stable snapshot of an append-only file.
#[derive(Debug)]
pub struct IndexedCsvFile {
    path: PathBuf,
    file: Option<File>,
    size_in_bytes: u64,
    separator: u8,
    min_pos: u64,
    max_pos: Option<u64>,
}

impl IndexedCsvFile {
    /// Open a file and compute its data-region bounds.
    ///
    /// # Arguments
    /// * `path` - File to open
    /// * `has_header_row` - Skip the first line when computing `min_byte_position`
    /// * `separator` - Line separator byte (normally `b'\n'`)
    ///
    /// # Errors
    /// Returns [`FileError::Open`] if the file cannot be opened or stat'd.
    /// A file with no complete data line opens successfully with an empty
    /// data region.
    pub fn open(
        path: impl AsRef<Path>,
        has_header_row: bool,
        separator: u8,
    ) -> Result<Self, FileError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| FileError::Open {
            path: path.display().to_string(),
            source: e,
        })?;
        let size_in_bytes = file
            .metadata()
            .map_err(|e| FileError::Open {
                path: path.display().to_string(),
                source: e,
            })?
            .len();

        let mut indexed = Self {
            path,
            file: Some(file),
            size_in_bytes,
            separator,
            min_pos: 0,
            max_pos: None,
        };

        indexed.min_pos = if has_header_row {
            // The data region starts just past the header line's separator.
            // A header-only file without a separator has an empty region.
            match indexed.find_separator_forward(0)? {
                Some(pos) => pos + 1,
                None => size_in_bytes,
            }
        } else {
            0
        };
        indexed.max_pos = indexed.find_max_byte_position()?;

        debug!(
            path = %indexed.path.display(),
            size = size_in_bytes,
            min_pos = indexed.min_pos,
            max_pos = ?indexed.max_pos,
            "opened line-indexed file"
        );

        Ok(indexed)
    }

    /// Size of the file in bytes, as observed at open time.
    pub fn size_in_bytes(&self) -> u64 {
        self.size_in_bytes
    }

    /// Byte offset of the first data line (past the header line, if any).
    pub fn min_byte_position(&self) -> u64 {
        self.min_pos
    }

    /// Byte offset of the separator terminating the last complete line, or
    /// `None` when the file holds no complete line at all.
    ///
    /// A trailing partial line (no final separator) is excluded as incomplete.
    pub fn max_byte_position(&self) -> Option<u64> {
        self.max_pos
    }

    /// The data region `[min, max]`, or `None` when the file has no complete
    /// data line. All resume logic short-circuits on an empty region.
    pub fn data_region(&self) -> Option<(u64, u64)> {
        match self.max_pos {
            Some(max) if self.min_pos <= max => Some((self.min_pos, max)),
            _ => None,
        }
    }

    /// Find the complete line containing the given byte position.
    ///
    /// Returns `None` if `pos` is outside `[0, size_in_bytes)` or falls inside
    /// a trailing partial line, which has no terminating separator yet.
    ///
    /// If the byte at `pos` is itself the separator, the line it terminates is
    /// returned.
    pub fn line_containing(&self, pos: u64) -> Result<Option<LineRecord>, FileError> {
        if pos >= self.size_in_bytes {
            return Ok(None);
        }

        let byte = self.read_byte(pos)?;
        let (start_pos, end_pos) = if byte == self.separator {
            let start = match pos.checked_sub(1) {
                Some(before) => self
                    .find_separator_backward(before)?
                    .map(|p| p + 1)
                    .unwrap_or(0),
                None => 0,
            };
            (start, pos)
        } else {
            let start = self
                .find_separator_backward(pos)?
                .map(|p| p + 1)
                .unwrap_or(0);
            let end = match self.find_separator_forward(pos)? {
                Some(p) => p,
                // Trailing partial line: no terminator, not a complete line.
                None => return Ok(None),
            };
            (start, end)
        };

        let text_bytes = self.read_exact_at(start_pos, (end_pos - start_pos) as usize)?;
        Ok(Some(LineRecord {
            start_pos,
            end_pos,
            text: String::from_utf8_lossy(&text_bytes).into_owned(),
        }))
    }

    /// The first complete data line, if any.
    pub fn first_record(&self) -> Result<Option<LineRecord>, FileError> {
        match self.data_region() {
            Some((min, _)) => self.line_containing(min),
            None => Ok(None),
        }
    }

    /// The last complete data line, if any.
    pub fn last_record(&self) -> Result<Option<LineRecord>, FileError> {
        match self.data_region() {
            Some((_, max)) => self.line_containing(max),
            None => Ok(None),
        }
    }

    /// Read up to `max_count` whole lines forward from `start_pos`.
    ///
    /// Reads in fixed-size chunks, holding a possibly-partial trailing line
    /// back across chunk boundaries, and stops at the end of the data region.
    /// Returns fewer than `max_count` lines when the region is exhausted, and
    /// an empty vector when `start_pos` is outside the region.
    pub fn read_lines(&self, start_pos: u64, max_count: usize) -> Result<Vec<String>, FileError> {
        let mut lines = Vec::new();
        let max_pos = match self.max_pos {
            Some(max) => max,
            None => return Ok(lines),
        };
        if start_pos < self.min_pos || start_pos >= self.size_in_bytes || max_count == 0 {
            return Ok(lines);
        }

        let mut pos = start_pos;
        let mut held_back: Vec<u8> = Vec::new();

        while pos <= max_pos && lines.len() < max_count {
            // Never read past the last complete line's separator.
            let want = READ_CHUNK.min((max_pos - pos + 1) as usize);
            let chunk = self.read_exact_at(pos, want)?;
            if chunk.is_empty() {
                break;
            }
            pos += chunk.len() as u64;

            let mut data = std::mem::take(&mut held_back);
            data.extend_from_slice(&chunk);

            let mut pieces: Vec<&[u8]> = data.split(|b| *b == self.separator).collect();
            // The final piece is partial (or empty when the chunk ended on a
            // separator); hang on to it for the next chunk.
            held_back = pieces.pop().map(|p| p.to_vec()).unwrap_or_default();

            for piece in pieces {
                if lines.len() == max_count {
                    break;
                }
                lines.push(String::from_utf8_lossy(piece).into_owned());
            }
        }

        Ok(lines)
    }

    /// Release the file handle. Idempotent; closing twice is a no-op.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), "closed file handle");
        } else {
            debug!(path = %self.path.display(), "file already closed");
        }
    }

    /// Whether the handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    // Locate the separator of the last complete line: if the file's final
    // byte is the separator that position is the answer, otherwise scan
    // backward for the nearest one.
    fn find_max_byte_position(&self) -> Result<Option<u64>, FileError> {
        let last = match self.size_in_bytes.checked_sub(1) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        if self.read_byte(last)? == self.separator {
            return Ok(Some(last));
        }
        self.find_separator_backward(last)
    }

    // Scan backward from `from` (inclusive) for the separator byte.
    fn find_separator_backward(&self, from: u64) -> Result<Option<u64>, FileError> {
        let mut end = from;
        loop {
            let window_start = end.saturating_sub(SCAN_WINDOW as u64 - 1);
            let window = self.read_exact_at(window_start, (end - window_start + 1) as usize)?;
            if let Some(offset) = window.iter().rposition(|b| *b == self.separator) {
                return Ok(Some(window_start + offset as u64));
            }
            if window_start == 0 {
                return Ok(None);
            }
            end = window_start - 1;
        }
    }

    // Scan forward from `from` (inclusive) for the separator byte.
    fn find_separator_forward(&self, from: u64) -> Result<Option<u64>, FileError> {
        let mut start = from;
        while start < self.size_in_bytes {
            let want = SCAN_WINDOW.min((self.size_in_bytes - start) as usize);
            let window = self.read_exact_at(start, want)?;
            if window.is_empty() {
                break;
            }
            if let Some(offset) = window.iter().position(|b| *b == self.separator) {
                return Ok(Some(start + offset as u64));
            }
            start += window.len() as u64;
        }
        Ok(None)
    }

    fn read_byte(&self, pos: u64) -> Result<u8, FileError> {
        let bytes = self.read_exact_at(pos, 1)?;
        match bytes.first() {
            Some(byte) => Ok(*byte),
            // An empty read at a validated position means the file shrank,
            // which violates the append-only assumption.
            None => Err(FileError::Read(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "file shrank while reading",
            ))),
        }
    }

    // Positional read of up to `len` bytes starting at `pos`. Short reads at
    // end-of-snapshot return what was available.
    fn read_exact_at(&self, pos: u64, len: usize) -> Result<Vec<u8>, FileError> {
        let file = self.file.as_ref().ok_or(FileError::Closed)?;
        let mut handle = file;
        handle.seek(SeekFrom::Start(pos))?;

        let mut buffer = vec![0u8; len];
        let mut total = 0usize;
        while total < len {
            let read = handle.read(&mut buffer[total..])?;
            if read == 0 {
                break;
            }
            total += read;
        }
        buffer.truncate(total);
        Ok(buffer)
    }
}
