//! HTTP implementation of the feed store interface.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

use super::{FeedStore, StoreError};
use crate::config::StoreConfig;
use crate::UploadBatch;

/// Header carrying the feed's API key on every request.
const API_KEY_HEADER: &str = "FeedApiKey";

/// Cap on the response-body excerpt kept in error messages.
const ERROR_BODY_EXCERPT: usize = 256;

/// Response envelope of `GET /feed?fields=maxTimeSecs`.
#[derive(Debug, Deserialize)]
struct FeedInfoResponse {
    data: Option<FeedInfo>,
}

#[derive(Debug, Deserialize)]
struct FeedInfo {
    #[serde(rename = "maxTimeSecs")]
    max_time_secs: Option<f64>,
}

/// Feed store client speaking the HTTP API: `GET {root}/feed?fields=maxTimeSecs`
/// for the high-water mark and `PUT {root}/feed` for batch uploads, both
/// authenticated with a `FeedApiKey` header.
///
/// There is deliberately no retry here: the scheduler's error interval is the
/// sole retry mechanism.
pub struct HttpFeedClient {
    client: Client,
    api_root_url: String,
    feed_api_key: String,
}

impl HttpFeedClient {
    /// Build a client from store configuration.
    ///
    /// # Errors
    /// Returns [`StoreError::Transport`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_root_url: config.api_root_url.trim_end_matches('/').to_string(),
            feed_api_key: config.feed_api_key.clone(),
        })
    }

    fn feed_url(&self) -> String {
        format!("{}/feed", self.api_root_url)
    }
}

#[async_trait]
impl FeedStore for HttpFeedClient {
    async fn max_timestamp(&self) -> Result<Option<f64>, StoreError> {
        let url = self.feed_url();
        debug!(%url, "fetching high-water-mark timestamp");

        let response = self
            .client
            .get(&url)
            .query(&[("fields", "maxTimeSecs")])
            .header(API_KEY_HEADER, &self.feed_api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = excerpt(response.text().await.unwrap_or_default());
            return Err(StoreError::UnexpectedStatus {
                status: status.as_u16(),
                detail,
            });
        }

        let body: FeedInfoResponse = response
            .json()
            .await
            .map_err(|e| StoreError::MalformedResponse(format!("invalid body: {e}")))?;

        let info = body
            .data
            .ok_or_else(|| StoreError::MalformedResponse("missing data field".to_string()))?;

        trace!(max_time_secs = ?info.max_time_secs, "high-water mark fetched");
        Ok(info.max_time_secs)
    }

    async fn put_batch(&self, batch: &UploadBatch) -> Result<(), StoreError> {
        let url = self.feed_url();
        debug!(%url, rows = batch.len(), "uploading batch");

        let response = self
            .client
            .put(&url)
            .header(API_KEY_HEADER, &self.feed_api_key)
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = excerpt(response.text().await.unwrap_or_default());
            return Err(StoreError::UnexpectedStatus {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(())
    }
}

fn excerpt(body: String) -> String {
    let mut detail = body;
    if detail.len() > ERROR_BODY_EXCERPT {
        // Back the cut off to a char boundary; bodies are not always ASCII.
        let mut cut = ERROR_BODY_EXCERPT;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        detail.truncate(cut);
        detail.push_str("...");
    }
    detail
}
