//! # CSV Feed Uploader Library
//!
//! Incrementally uploads new rows appended to a growing, append-only CSV file
//! to a remote time-series feed store, resuming correctly after restarts
//! without re-uploading or skipping records.
//!
//! ## How resume works
//!
//! Instead of persisting local state, the uploader asks the remote store for
//! the maximum timestamp it already holds (the *high-water mark*) and binary
//! searches the CSV **by byte position** for the first line newer than it.
//! Each probe resolves the line containing the probed byte and compares that
//! line's timestamp; this keeps resume sub-linear in file size without ever
//! scanning the whole file.
//!
//! ## Architecture
//!
//! - [`csvfile`] - Random-access, line-oriented view over a flat file
//! - [`layout`] - Field layout: timestamp extraction and typed row transform
//! - [`resume`] - Resume-point resolution via byte-position binary search
//! - [`store`] - Remote feed store client (two calls: high-water mark, put batch)
//! - [`uploader`] - Upload cycle orchestration and adaptive scheduling
//! - [`config`] - TOML configuration loading and validation
//! - [`shutdown`] - Graceful shutdown honored between upload cycles
//!
//! ## Quick Start
//!
//! ```no_run
//! use csv_feed_uploader::config::Config;
//! use csv_feed_uploader::shutdown::ShutdownLatch;
//! use csv_feed_uploader::store::HttpFeedClient;
//! use csv_feed_uploader::uploader::{Scheduler, UploadCycle};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("uploader.toml")?;
//! let store = HttpFeedClient::new(&config.store)?;
//! let shutdown = ShutdownLatch::new();
//! shutdown.trigger_on_ctrl_c();
//! let cycle = UploadCycle::new(&config, store);
//! Scheduler::new(cycle, &config.upload)
//!     .with_shutdown(shutdown)
//!     .run()
//!     .await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use rust_decimal::Decimal;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// TOML configuration loading and validation
pub mod config;

/// Random-access line-indexed file reading
pub mod csvfile;

/// CSV field layout and typed parsing
pub mod layout;

/// Resume-point resolution
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Remote feed store client
pub mod store;

/// Upload cycle orchestration and scheduling
pub mod uploader;

// Re-export commonly used types
pub use csvfile::IndexedCsvFile;
pub use layout::FieldLayout;
pub use uploader::CycleOutcome;

/// A typed channel value extracted from one CSV field.
///
/// Serializes untagged, so a row renders as a flat JSON array of scalars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Floating-point value
    Float(f64),
    /// Integer value
    Int(i64),
    /// Lossless decimal value (serialized as a JSON number)
    Decimal(Decimal),
    /// Raw string value, the default when no parser is configured
    Text(String),
}

/// One row of an upload batch: a timestamp plus the configured channel values.
///
/// Serializes as the positional array `[timestamp, v1, ..., vn]` the feed API
/// expects, aligned to [`UploadBatch::channel_names`].
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRow {
    /// Row timestamp in seconds (fractional seconds permitted)
    pub timestamp: f64,
    /// Channel values in `channel_names` order
    pub values: Vec<Value>,
}

impl Serialize for UploadRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(1 + self.values.len()))?;
        seq.serialize_element(&self.timestamp)?;
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

/// A bounded, ordered group of rows sent to the feed store in one call.
///
/// Row order matches file order; the source file is assumed to carry
/// monotonically non-decreasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadBatch {
    /// Output channel names, positionally aligned with each row's values
    pub channel_names: Vec<String>,
    /// Rows in ascending file order
    #[serde(rename = "data")]
    pub rows: Vec<UploadRow>,
}

impl UploadBatch {
    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
