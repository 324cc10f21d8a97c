//! In-memory [`ResultsStore`] for command tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{
    ClientError, ListRecordsRequest, ListRecordsResponse, ListResultsRequest, ListResultsResponse,
    LogChunk, LogStream, Record, RecordData, ResultsStore, StoredResult,
};

#[derive(Default)]
pub struct FakeResultsStore {
    pub results: Vec<StoredResult>,
    pub records: Vec<Record>,
    pub log_chunks: Vec<LogChunk>,
    pub fail_with: Option<String>,
    calls: AtomicUsize,
    pub last_records_request: Mutex<Option<ListRecordsRequest>>,
    pub last_results_request: Mutex<Option<ListResultsRequest>>,
    pub last_log_name: Mutex<Option<String>>,
}

impl FakeResultsStore {
    pub fn with_results(results: Vec<StoredResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(ClientError::Status {
                status: 503,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub fn record(name: &str, data_type: &str, payload: serde_json::Value) -> Record {
    Record {
        name: name.to_string(),
        data: RecordData {
            data_type: data_type.to_string(),
            value: serde_json::to_vec(&payload).unwrap_or_default(),
        },
    }
}

/// Result as the gateway would serialize it, decoded through serde.
pub fn stored_result(value: serde_json::Value) -> StoredResult {
    serde_json::from_value(value).expect("valid result fixture")
}

pub fn text_chunk(content_type: &str, text: &str) -> LogChunk {
    LogChunk {
        content_type: content_type.to_string(),
        data: text.as_bytes().to_vec(),
    }
}

#[async_trait]
impl ResultsStore for FakeResultsStore {
    async fn list_results(
        &self,
        request: &ListResultsRequest,
    ) -> Result<ListResultsResponse, ClientError> {
        self.enter()?;
        *self.last_results_request.lock().unwrap() = Some(request.clone());
        Ok(ListResultsResponse {
            results: self.results.clone(),
            next_page_token: String::new(),
        })
    }

    async fn list_records(
        &self,
        request: &ListRecordsRequest,
    ) -> Result<ListRecordsResponse, ClientError> {
        self.enter()?;
        *self.last_records_request.lock().unwrap() = Some(request.clone());
        Ok(ListRecordsResponse {
            records: self.records.clone(),
            next_page_token: String::new(),
        })
    }

    async fn get_log(&self, name: &str) -> Result<Box<dyn LogStream>, ClientError> {
        self.enter()?;
        *self.last_log_name.lock().unwrap() = Some(name.to_string());
        Ok(Box::new(FakeLogStream {
            chunks: self.log_chunks.iter().cloned().collect(),
        }))
    }
}

struct FakeLogStream {
    chunks: VecDeque<LogChunk>,
}

#[async_trait]
impl LogStream for FakeLogStream {
    async fn recv(&mut self) -> Result<Option<LogChunk>, ClientError> {
        Ok(self.chunks.pop_front())
    }
}
