//! REST record store
//!
//! Talks to a collection endpoint with the usual conventions:
//! `POST {base}`, `GET {base}?sessionId=..`, `DELETE {base}/{id}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

use super::{RecordStore, StorageError};
use crate::types::{MonitoringRecord, RecordId};

/// A record store reached over HTTP
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
}

impl HttpRecordStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn record_url(&self, id: &RecordId) -> String {
        format!("{}/{}", self.base_url, id)
    }

    fn check(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(StorageError::Rejected(status.as_u16()))
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StorageError::SerializationError(e.to_string())
        } else {
            StorageError::NetworkError(e.to_string())
        }
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn submit(&self, record: &MonitoringRecord) -> Result<MonitoringRecord, StorageError> {
        let response = self.client.post(&self.base_url).json(record).send().await?;
        let stored = Self::check(response)?.json::<MonitoringRecord>().await?;
        Ok(stored)
    }

    async fn records_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<MonitoringRecord>, StorageError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("sessionId", session_id)])
            .send()
            .await?;
        let records = Self::check(response)?.json::<Vec<MonitoringRecord>>().await?;
        Ok(records)
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), StorageError> {
        let response = self.client.delete(self.record_url(id)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(id.clone()));
        }
        Self::check(response)?;
        Ok(())
    }
}
