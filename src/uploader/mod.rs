//! Upload cycle orchestration and adaptive scheduling.
//!
//! An [`UploadCycle`] performs one full pass: fetch the store's high-water
//! mark, open the file, resolve the resume position, read one bounded batch of
//! lines, transform them into typed rows and upload them. The [`Scheduler`]
//! runs cycles back to back, choosing the delay between them from the outcome
//! of the previous one.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::csvfile::{FileError, IndexedCsvFile};
use crate::layout::{FieldLayout, LayoutError};
use crate::resume::{resolve_resume_position, ResumeError, ResumePosition};
use crate::store::{FeedStore, StoreError};
use crate::{UploadBatch, UploadRow};

mod scheduler;

pub use scheduler::{Scheduler, UploadIntervals};

/// Errors from a single upload cycle.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The remote store rejected or failed a request
    #[error("store request failed: {0}")]
    Store(#[from] StoreError),

    /// The source file could not be opened or read
    #[error("file access failed: {0}")]
    File(#[from] FileError),

    /// The resume position could not be resolved
    #[error("resume resolution failed: {0}")]
    Resume(#[from] ResumeError),

    /// A line read for upload could not be transformed into a row
    #[error("malformed row: {0}")]
    Row(#[from] LayoutError),
}

/// What a single upload cycle accomplished.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The file held no records newer than the store's high-water mark
    NoData,

    /// This many records were uploaded successfully
    Uploaded(usize),

    /// The cycle failed; the error has already been logged
    Failed(UploadError),
}

/// One-shot uploader: each [`run`](UploadCycle::run) call performs a complete
/// fetch-resolve-read-upload pass against a fresh snapshot of the file.
///
/// The file is opened anew every cycle so line boundaries stay fixed for the
/// duration of a pass even while a writer keeps appending.
pub struct UploadCycle<S: FeedStore> {
    store: S,
    csv_path: PathBuf,
    has_header_row: bool,
    line_separator: u8,
    layout: FieldLayout,
    max_records_per_batch: usize,
}

impl<S: FeedStore> UploadCycle<S> {
    /// Build a cycle from configuration and a store client.
    pub fn new(config: &Config, store: S) -> Self {
        Self {
            store,
            csv_path: config.csv_path(),
            has_header_row: config.csv.has_header_row,
            line_separator: config.line_separator_byte(),
            layout: config.field_layout(),
            max_records_per_batch: config.upload.max_records_per_batch,
        }
    }

    /// Run one upload cycle.
    ///
    /// Never panics and never returns `Err`; every failure is folded into
    /// [`CycleOutcome::Failed`] so the scheduler can pick the error interval.
    pub async fn run(&self) -> CycleOutcome {
        match self.try_run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "upload cycle failed");
                CycleOutcome::Failed(e)
            }
        }
    }

    async fn try_run(&self) -> Result<CycleOutcome, UploadError> {
        // High-water mark first so the subsequent file snapshot can only be
        // newer than what the comparison assumes.
        let high_water = self.store.max_timestamp().await?;
        debug!(?high_water, "fetched store high-water mark");

        let file = IndexedCsvFile::open(&self.csv_path, self.has_header_row, self.line_separator)
            .map_err(|e| {
                warn!(
                    path = %self.csv_path.display(),
                    "cannot open source file; check the csv.path setting"
                );
                e
            })?;

        let start_pos = match resolve_resume_position(&file, &self.layout, high_water)? {
            ResumePosition::StartAt(pos) => pos,
            ResumePosition::NothingToDo => {
                debug!("store already holds every complete record");
                return Ok(CycleOutcome::NoData);
            }
        };

        let lines = file.read_lines(start_pos, self.max_records_per_batch)?;
        if lines.is_empty() {
            debug!(start_pos, "no complete lines at resume position");
            return Ok(CycleOutcome::NoData);
        }

        let rows = lines
            .iter()
            .map(|line| self.layout.row_of(line))
            .collect::<Result<Vec<UploadRow>, LayoutError>>()?;

        let batch = UploadBatch {
            channel_names: self.layout.channel_names(),
            rows,
        };

        let count = batch.len();
        self.store.put_batch(&batch).await?;
        info!(
            records = count,
            start_pos,
            first_timestamp = batch.rows.first().map(|r| r.timestamp),
            last_timestamp = batch.rows.last().map(|r| r.timestamp),
            "batch uploaded"
        );

        Ok(CycleOutcome::Uploaded(count))
    }
}
