//! HTTP telemetry feed
//!
//! Reads the JSON array served at the configured feed URL.

use std::time::Duration;

use async_trait::async_trait;

use super::{FeedError, TelemetryFeed};
use crate::types::Sample;

/// A telemetry feed reached over HTTP
pub struct HttpTelemetryFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpTelemetryFeed {
    /// Create a feed client with a per-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else if e.is_decode() {
            FeedError::MalformedSnapshot(e.to_string())
        } else {
            FeedError::NetworkError(e.to_string())
        }
    }
}

#[async_trait]
impl TelemetryFeed for HttpTelemetryFeed {
    async fn fetch_snapshot(&self) -> Result<Vec<Sample>, FeedError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UnexpectedStatus(status.as_u16()));
        }

        let samples = response.json::<Vec<Sample>>().await?;
        log::trace!("[Feed] {} returned {} samples", self.url, samples.len());
        Ok(samples)
    }
}
