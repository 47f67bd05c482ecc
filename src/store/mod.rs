//! Remote feed store interface.
//!
//! The core touches the store through exactly two calls: fetch the maximum
//! stored timestamp (the high-water mark the resume resolver keys on) and
//! push one batch of rows. Both are opaque network operations; everything
//! else about the store's API surface is out of scope.

pub mod client;

pub use client::HttpFeedClient;

use async_trait::async_trait;

use crate::UploadBatch;

/// Remote store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, TLS, ...)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("unexpected response status {status}: {detail}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body excerpt, when available
        detail: String,
    },

    /// The response body was missing an expected field
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// The two-call surface of the remote time-series store.
///
/// `max_timestamp` distinguishes "the store has no data yet" (`Ok(None)`)
/// from a failed or malformed response (`Err`). Implementations must not
/// conflate the two: the former uploads the whole file, the latter backs off.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Fetch the maximum timestamp already stored, or `None` when the store
    /// reports no prior data.
    async fn max_timestamp(&self) -> Result<Option<f64>, StoreError>;

    /// Push one batch of rows.
    async fn put_batch(&self, batch: &UploadBatch) -> Result<(), StoreError>;
}
