//! TOML configuration loading and validation.
//!
//! The uploader is driven by a single TOML file with three sections:
//!
//! ```toml
//! [csv]
//! path = "~/data/sensors.csv"
//! has_header_row = true
//!
//! [csv.timestamp]
//! index = 0
//! parser = "unix_seconds"
//!
//! [[csv.fields]]
//! name = "humidity"
//! index = 1
//! parser = "int"
//!
//! [store]
//! api_root_url = "https://esdr.example.org/api/v1/feeds/1234"
//! feed_api_key = "0123abcd"
//!
//! [upload]
//! max_records_per_batch = 5000
//! ```
//!
//! Everything except the paths, the key and the field layout has a sensible
//! default; see the field docs below.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::layout::{FieldLayout, FieldSpec, TimestampParser, ValueParser};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Source file and field layout
    pub csv: CsvConfig,
    /// Remote feed store endpoint and credentials
    pub store: StoreConfig,
    /// Batch sizing and scheduling
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Source file settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvConfig {
    /// Path to the append-only CSV file; `~` is expanded
    pub path: String,
    /// Whether the first line is a header and should never be uploaded
    #[serde(default = "default_true")]
    pub has_header_row: bool,
    /// Field delimiter, a single ASCII character
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: String,
    /// Line separator, a single ASCII character
    #[serde(default = "default_line_separator")]
    pub line_separator: String,
    /// Which field carries the timestamp and how to parse it
    pub timestamp: TimestampConfig,
    /// Output channels, in upload order
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// Timestamp field settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimestampConfig {
    /// Zero-based field index of the timestamp
    pub index: usize,
    /// Timestamp format
    #[serde(default)]
    pub parser: TimestampParser,
}

/// One output channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    /// Channel name reported to the store
    pub name: String,
    /// Zero-based field index within the CSV line
    pub index: usize,
    /// Typed parser for the value
    #[serde(default)]
    pub parser: ValueParser,
}

/// Remote feed store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Root URL of the feed API, without the trailing `/feed`
    pub api_root_url: String,
    /// API key sent in the `FeedApiKey` header
    pub feed_api_key: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Batch sizing and scheduling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Upper bound on records per upload request
    #[serde(default = "default_max_records_per_batch")]
    pub max_records_per_batch: usize,
    /// Keep cycling until shutdown; `false` runs a single cycle and exits
    #[serde(default = "default_true")]
    pub continuous: bool,
    /// Minimum uploaded record count for a cycle to be considered catching up
    #[serde(default = "default_record_count_threshold")]
    pub record_count_threshold: usize,
    /// Delay after a catching-up cycle, in milliseconds
    #[serde(default = "default_fast_interval_ms")]
    pub fast_interval_ms: u64,
    /// Delay after a quiet cycle, in milliseconds
    #[serde(default = "default_normal_interval_ms")]
    pub normal_interval_ms: u64,
    /// Delay after a failed cycle, in milliseconds
    #[serde(default = "default_error_interval_ms")]
    pub error_interval_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_records_per_batch: default_max_records_per_batch(),
            continuous: true,
            record_count_threshold: default_record_count_threshold(),
            fast_interval_ms: default_fast_interval_ms(),
            normal_interval_ms: default_normal_interval_ms(),
            error_interval_ms: default_error_interval_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_field_delimiter() -> String {
    ",".to_string()
}

fn default_line_separator() -> String {
    "\n".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_records_per_batch() -> usize {
    5000
}

fn default_record_count_threshold() -> usize {
    2
}

fn default_fast_interval_ms() -> u64 {
    1
}

fn default_normal_interval_ms() -> u64 {
    1000
}

fn default_error_interval_ms() -> u64 {
    300_000
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.csv.path.trim().is_empty() {
            bail!("csv.path must not be empty");
        }
        single_ascii_byte("csv.field_delimiter", &self.csv.field_delimiter)?;
        single_ascii_byte("csv.line_separator", &self.csv.line_separator)?;
        if self.csv.field_delimiter == self.csv.line_separator {
            bail!("csv.field_delimiter and csv.line_separator must differ");
        }
        if self.csv.fields.is_empty() {
            bail!("csv.fields must name at least one channel");
        }
        for field in &self.csv.fields {
            if field.name.trim().is_empty() {
                bail!("csv.fields entries must have a non-empty name");
            }
        }
        let mut names: Vec<&str> = self.csv.fields.iter().map(|f| f.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.csv.fields.len() {
            bail!("csv.fields names must be unique");
        }

        if self.store.api_root_url.trim().is_empty() {
            bail!("store.api_root_url must not be empty");
        }
        if self.store.feed_api_key.trim().is_empty() {
            bail!("store.feed_api_key must not be empty");
        }
        if self.store.request_timeout_secs == 0 {
            bail!("store.request_timeout_secs must be at least 1");
        }

        if self.upload.max_records_per_batch == 0 {
            bail!("upload.max_records_per_batch must be at least 1");
        }

        Ok(())
    }

    /// Source file path with `~` expanded.
    pub fn csv_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.csv.path).into_owned())
    }

    /// The line separator as a single byte.
    pub fn line_separator_byte(&self) -> u8 {
        self.csv.line_separator.as_bytes()[0]
    }

    /// Field layout derived from the `[csv]` section.
    pub fn field_layout(&self) -> FieldLayout {
        let fields = self
            .csv
            .fields
            .iter()
            .map(|f| FieldSpec {
                name: f.name.clone(),
                index: f.index,
                parser: f.parser,
            })
            .collect();
        FieldLayout::new(
            self.csv.field_delimiter.chars().next().unwrap_or(','),
            self.csv.timestamp.index,
            self.csv.timestamp.parser,
            fields,
        )
    }
}

fn single_ascii_byte(name: &str, value: &str) -> Result<()> {
    if value.len() != 1 || !value.is_ascii() {
        bail!("{name} must be a single ASCII character, got {value:?}");
    }
    Ok(())
}
