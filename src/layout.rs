//! CSV field layout: timestamp extraction and typed row transformation.
//!
//! A [`FieldLayout`] describes how to turn one raw CSV line into an upload
//! row: which field holds the timestamp and how to parse it, and which fields
//! feed which output channels with which typed parsers. Parsing is strict:
//! any line that cannot be split or parsed per the layout is an error, never
//! silently skipped, because a skipped-but-unsent line older than the next
//! resume point would be permanently lost.

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::{UploadRow, Value};

/// Errors raised when a line does not match the configured layout
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The line has fewer fields than the layout requires
    #[error("line has {found} fields but index {index} is required: {line:?}")]
    MissingField {
        /// Field index the layout asked for
        index: usize,
        /// Number of fields the line actually split into
        found: usize,
        /// The offending line
        line: String,
    },

    /// A field's raw text could not be parsed with the configured parser
    #[error("field {index} ({raw:?}) failed to parse as {expected}: {reason}")]
    Parse {
        /// Field index within the CSV line
        index: usize,
        /// Raw field text
        raw: String,
        /// Name of the expected type
        expected: &'static str,
        /// Parser error detail
        reason: String,
    },

    /// The timestamp parsed to a value that cannot be ordered (NaN)
    #[error("timestamp field {index} ({raw:?}) is not an orderable number")]
    UnorderedTimestamp {
        /// Timestamp field index
        index: usize,
        /// Raw field text
        raw: String,
    },
}

/// How to parse the timestamp field into seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampParser {
    /// UNIX time as a float in seconds (the default)
    #[default]
    UnixSeconds,
    /// UNIX time as a float in milliseconds, converted to seconds
    UnixMillis,
    /// RFC 3339 datetime, converted to fractional UNIX seconds
    Rfc3339,
}

impl TimestampParser {
    /// Parse a raw timestamp field into seconds.
    pub fn parse(&self, index: usize, raw: &str) -> Result<f64, LayoutError> {
        let seconds = match self {
            TimestampParser::UnixSeconds => {
                raw.parse::<f64>().map_err(|e| LayoutError::Parse {
                    index,
                    raw: raw.to_string(),
                    expected: "unix seconds",
                    reason: e.to_string(),
                })?
            }
            TimestampParser::UnixMillis => {
                let millis = raw.parse::<f64>().map_err(|e| LayoutError::Parse {
                    index,
                    raw: raw.to_string(),
                    expected: "unix milliseconds",
                    reason: e.to_string(),
                })?;
                millis / 1000.0
            }
            TimestampParser::Rfc3339 => {
                let dt = DateTime::parse_from_rfc3339(raw).map_err(|e| LayoutError::Parse {
                    index,
                    raw: raw.to_string(),
                    expected: "RFC 3339 datetime",
                    reason: e.to_string(),
                })?;
                dt.timestamp_micros() as f64 / 1_000_000.0
            }
        };

        if seconds.is_nan() {
            return Err(LayoutError::UnorderedTimestamp {
                index,
                raw: raw.to_string(),
            });
        }
        Ok(seconds)
    }
}

/// How to parse one channel's field into a typed [`Value`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueParser {
    /// Pass the raw string through unchanged (the default)
    #[default]
    Text,
    /// Parse as a signed integer
    Int,
    /// Parse as a float
    Float,
    /// Parse as a lossless decimal
    Decimal,
}

impl ValueParser {
    /// Parse a raw field into a typed value.
    pub fn parse(&self, index: usize, raw: &str) -> Result<Value, LayoutError> {
        match self {
            ValueParser::Text => Ok(Value::Text(raw.to_string())),
            ValueParser::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| LayoutError::Parse {
                    index,
                    raw: raw.to_string(),
                    expected: "integer",
                    reason: e.to_string(),
                }),
            ValueParser::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| LayoutError::Parse {
                    index,
                    raw: raw.to_string(),
                    expected: "float",
                    reason: e.to_string(),
                }),
            ValueParser::Decimal => Decimal::from_str(raw)
                .map(Value::Decimal)
                .map_err(|e| LayoutError::Parse {
                    index,
                    raw: raw.to_string(),
                    expected: "decimal",
                    reason: e.to_string(),
                }),
        }
    }
}

/// One output channel: its name, the CSV field it reads, and its parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Output channel name
    pub name: String,
    /// Zero-based field index within the CSV line
    pub index: usize,
    /// Typed parser for the field
    pub parser: ValueParser,
}

/// Layout of a CSV line: delimiter, timestamp field, and output channels.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    delimiter: char,
    timestamp_index: usize,
    timestamp_parser: TimestampParser,
    fields: Vec<FieldSpec>,
}

impl FieldLayout {
    /// Build a layout.
    pub fn new(
        delimiter: char,
        timestamp_index: usize,
        timestamp_parser: TimestampParser,
        fields: Vec<FieldSpec>,
    ) -> Self {
        Self {
            delimiter,
            timestamp_index,
            timestamp_parser,
            fields,
        }
    }

    /// Output channel names, in configured order.
    pub fn channel_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Extract the timestamp of a raw line, in seconds.
    ///
    /// Only the timestamp field is touched; the rest of the line is left
    /// unparsed. This is the probe the resume resolver runs many times.
    pub fn timestamp_of(&self, line: &str) -> Result<f64, LayoutError> {
        let line = line.trim();
        let raw = self.field_at(line, self.timestamp_index)?;
        self.timestamp_parser.parse(self.timestamp_index, raw)
    }

    /// Transform a raw line into an upload row: timestamp plus all configured
    /// channel values, each run through its typed parser.
    pub fn row_of(&self, line: &str) -> Result<UploadRow, LayoutError> {
        let line = line.trim();
        let timestamp = {
            let raw = self.field_at(line, self.timestamp_index)?;
            self.timestamp_parser.parse(self.timestamp_index, raw)?
        };

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let raw = self.field_at(line, field.index)?;
            values.push(field.parser.parse(field.index, raw)?);
        }

        Ok(UploadRow { timestamp, values })
    }

    fn field_at<'a>(&self, line: &'a str, index: usize) -> Result<&'a str, LayoutError> {
        let mut count = 0;
        for (i, field) in line.split(self.delimiter).enumerate() {
            if i == index {
                return Ok(field);
            }
            count = i + 1;
        }
        Err(LayoutError::MissingField {
            index,
            found: count,
            line: line.to_string(),
        })
    }
}
