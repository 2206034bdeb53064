//! Telemetry feed collaborator
//!
//! The feed is shared by every device in the clinic and is not incremental:
//! each read returns every sample it currently knows about.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Sample;

pub use http::HttpTelemetryFeed;

/// Error types for feed reads
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Feed request timed out")]
    Timeout,

    #[error("Feed answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

/// Full-snapshot read of the external telemetry feed
#[async_trait]
pub trait TelemetryFeed: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Vec<Sample>, FeedError>;
}
