//! Client side of the results store: request/response types, the store
//! trait the commands are written against, and the HTTP gateway
//! implementation.

mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpResultsStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("log stream ended before any data was received")]
    EmptyStream,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResultsRequest {
    pub parent: String,
    pub filter: String,
    pub order_by: String,
    pub page_size: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRecordsRequest {
    pub parent: String,
    pub filter: String,
    pub order_by: String,
    pub page_size: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResultsResponse {
    #[serde(default)]
    pub results: Vec<StoredResult>,
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsResponse {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub next_page_token: String,
}

/// A result groups the records of one run and carries its summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResult {
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub summary: Option<RecordSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: SummaryStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SummaryStatus {
    Success,
    Failure,
    Timeout,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub name: String,
    #[serde(default)]
    pub data: RecordData,
}

/// Schema-tagged payload of a record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordData {
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default, deserialize_with = "base64_bytes")]
    pub value: Vec<u8>,
}

/// One piece of a log stream and the media type of the whole stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogChunk {
    pub content_type: String,
    pub data: Vec<u8>,
}

fn base64_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

#[async_trait]
pub trait LogStream: Send {
    /// Next chunk, or `None` once the server closed the stream.
    async fn recv(&mut self) -> Result<Option<LogChunk>, ClientError>;
}

#[async_trait]
pub trait ResultsStore: Send + Sync {
    async fn list_results(
        &self,
        request: &ListResultsRequest,
    ) -> Result<ListResultsResponse, ClientError>;

    async fn list_records(
        &self,
        request: &ListRecordsRequest,
    ) -> Result<ListRecordsResponse, ClientError>;

    async fn get_log(&self, name: &str) -> Result<Box<dyn LogStream>, ClientError>;
}
