//! Shared fixtures: an in-memory feed store and config/file builders.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use csv_feed_uploader::config::{
    Config, CsvConfig, FieldConfig, StoreConfig, TimestampConfig, UploadConfig,
};
use csv_feed_uploader::layout::{TimestampParser, ValueParser};
use csv_feed_uploader::store::{FeedStore, StoreError};
use csv_feed_uploader::UploadBatch;

/// In-memory feed store that behaves like the real one: its high-water mark
/// advances to the newest timestamp of every accepted batch.
///
/// Cloning shares the underlying state, so a clone can stand in for a store
/// that outlives any one uploader instance.
#[derive(Clone, Default)]
pub struct MemoryFeedStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    max_timestamp: Option<f64>,
    batches: Vec<UploadBatch>,
    fail_next_put: bool,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_timestamp(max_timestamp: f64) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().max_timestamp = Some(max_timestamp);
        store
    }

    pub fn fail_next_put(&self) {
        self.inner.lock().unwrap().fail_next_put = true;
    }

    pub fn batches(&self) -> Vec<UploadBatch> {
        self.inner.lock().unwrap().batches.clone()
    }

    pub fn uploaded_timestamps(&self) -> Vec<f64> {
        self.inner
            .lock()
            .unwrap()
            .batches
            .iter()
            .flat_map(|b| b.rows.iter().map(|r| r.timestamp))
            .collect()
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn max_timestamp(&self) -> Result<Option<f64>, StoreError> {
        Ok(self.inner.lock().unwrap().max_timestamp)
    }

    async fn put_batch(&self, batch: &UploadBatch) -> Result<(), StoreError> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_next_put {
            state.fail_next_put = false;
            return Err(StoreError::UnexpectedStatus {
                status: 500,
                detail: "injected failure".to_string(),
            });
        }
        if let Some(last) = batch.rows.last() {
            state.max_timestamp = Some(last.timestamp);
        }
        state.batches.push(batch.clone());
        Ok(())
    }
}

/// Config for a two-column file `timestamp,humidity` with a header row.
pub fn humidity_config(path: &Path, max_records_per_batch: usize) -> Config {
    Config {
        csv: CsvConfig {
            path: path.to_string_lossy().into_owned(),
            has_header_row: true,
            field_delimiter: ",".to_string(),
            line_separator: "\n".to_string(),
            timestamp: TimestampConfig {
                index: 0,
                parser: TimestampParser::UnixSeconds,
            },
            fields: vec![FieldConfig {
                name: "humidity".to_string(),
                index: 1,
                parser: ValueParser::Int,
            }],
        },
        store: StoreConfig {
            api_root_url: "http://localhost:0".to_string(),
            feed_api_key: "unused".to_string(),
            request_timeout_secs: 5,
        },
        upload: UploadConfig {
            max_records_per_batch,
            ..UploadConfig::default()
        },
    }
}

pub fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn append(file: &mut NamedTempFile, contents: &str) {
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
}
