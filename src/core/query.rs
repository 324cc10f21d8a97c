//! Builds store queries and turns their first page into runs.

use std::fmt;

use tracing::{debug, warn};

use crate::core::decode::decode;
use crate::core::error::{DecodeError, ResultsError};
use crate::core::model::TaskRun;
use crate::interfaces::results::{
    ClientError, ListRecordsRequest, ListResultsRequest, LogChunk, Record, ResultsStore,
    StoredResult,
};

/// Newest matching record is all a single-resource lookup needs.
pub const LOOKUP_PAGE_SIZE: i32 = 5;
pub const NEWEST_FIRST: &str = "create_time desc";
pub const PLAIN_TEXT: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    TaskRun,
    PipelineRun,
}

impl RunKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RunKind::TaskRun => "TaskRun",
            RunKind::PipelineRun => "PipelineRun",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            RunKind::TaskRun => "TaskRuns",
            RunKind::PipelineRun => "PipelineRuns",
        }
    }

    /// Discriminator used by the store's filter language.
    fn data_type(self) -> &'static str {
        match self {
            RunKind::TaskRun => "TASK_RUN",
            RunKind::PipelineRun => "PIPELINE_RUN",
        }
    }
}

/// Conjunction of `field==value` clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares against a bare identifier such as an enum name.
    pub fn ident(mut self, field: &str, value: &str) -> Self {
        self.clauses.push(format!("{}=={}", field, value));
        self
    }

    /// Compares against a quoted string literal.
    pub fn literal(mut self, field: &str, value: &str) -> Self {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        self.clauses.push(format!("{}==\"{}\"", field, escaped));
        self
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" && "))
    }
}

fn records_parent(namespace: &str) -> String {
    format!("{}/results/-", namespace)
}

/// Validates a user-supplied page limit before any remote call is made.
pub fn check_limit(limit: i64) -> Result<i32, ResultsError> {
    if limit < 0 {
        return Err(ResultsError::Usage(format!(
            "limit was {}, but must be greater than 0",
            limit
        )));
    }
    Ok(i32::try_from(limit).unwrap_or(i32::MAX))
}

pub fn lookup_request(kind: RunKind, namespace: &str, name: &str) -> ListRecordsRequest {
    ListRecordsRequest {
        parent: records_parent(namespace),
        filter: Filter::new()
            .ident("data_type", kind.data_type())
            .literal("data.metadata.name", name)
            .literal("data.metadata.namespace", namespace)
            .to_string(),
        order_by: NEWEST_FIRST.to_string(),
        page_size: LOOKUP_PAGE_SIZE,
    }
}

/// Most recent TaskRun record with this name in the namespace.
pub async fn latest_record(
    store: &dyn ResultsStore,
    namespace: &str,
    name: &str,
) -> Result<Record, ResultsError> {
    let kind = RunKind::TaskRun;
    let request = lookup_request(kind, namespace, name);
    let resp = store.list_records(&request).await.map_err(|e| {
        ResultsError::remote(
            format!(
                "failed to list {} from namespace {} of name {}",
                kind.plural(),
                namespace,
                name
            ),
            e,
        )
    })?;

    debug!(matches = resp.records.len(), namespace, name, "lookup finished");
    resp.records
        .into_iter()
        .next()
        .ok_or_else(|| ResultsError::NotFound {
            kind: kind.as_str(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        })
}

/// Decoded most recent TaskRun. A decode failure is fatal here: the caller
/// asked for this specific run.
pub async fn find_latest(
    store: &dyn ResultsStore,
    namespace: &str,
    name: &str,
) -> Result<TaskRun, ResultsError> {
    let record = latest_record(store, namespace, name).await?;
    Ok(decode_record(&record)?)
}

fn decode_record(record: &Record) -> Result<TaskRun, DecodeError> {
    decode(&record.name, &record.data.value, &record.data.data_type)
}

/// Every TaskRun on the first page. Entries that fail to decode are left
/// out and reported through the log.
pub async fn list_task_runs(
    store: &dyn ResultsStore,
    namespace: &str,
    limit: i64,
) -> Result<Vec<TaskRun>, ResultsError> {
    let page_size = check_limit(limit)?;
    let kind = RunKind::TaskRun;
    let request = ListRecordsRequest {
        parent: records_parent(namespace),
        filter: Filter::new().ident("data_type", kind.data_type()).to_string(),
        order_by: String::new(),
        page_size,
    };

    let resp = store.list_records(&request).await.map_err(|e| {
        ResultsError::remote(
            format!("failed to list {} from namespace {}", kind.plural(), namespace),
            e,
        )
    })?;
    if !resp.next_page_token.is_empty() {
        debug!(namespace, "more {} available beyond the first page", kind.plural());
    }

    let total = resp.records.len();
    let runs: Vec<TaskRun> = resp
        .records
        .iter()
        .filter_map(|record| match decode_record(record) {
            Ok(run) => Some(run),
            Err(e) => {
                warn!("skipping record: {}", e);
                None
            }
        })
        .collect();

    if runs.len() < total {
        warn!(
            "{} of {} {} could not be displayed",
            total - runs.len(),
            total,
            kind.plural()
        );
    }
    Ok(runs)
}

/// PipelineRun results on the first page; only their summaries are used.
pub async fn list_pipeline_runs(
    store: &dyn ResultsStore,
    namespace: &str,
    limit: i64,
) -> Result<Vec<StoredResult>, ResultsError> {
    let page_size = check_limit(limit)?;
    let kind = RunKind::PipelineRun;
    let request = ListResultsRequest {
        parent: namespace.to_string(),
        filter: Filter::new().ident("summary.type", kind.data_type()).to_string(),
        order_by: String::new(),
        page_size,
    };

    let resp = store.list_results(&request).await.map_err(|e| {
        ResultsError::remote(
            format!("failed to list {} from namespace {}", kind.plural(), namespace),
            e,
        )
    })?;
    if !resp.next_page_token.is_empty() {
        debug!(namespace, "more {} available beyond the first page", kind.plural());
    }
    Ok(resp.results)
}

/// Log resource name belonging to a record.
pub fn log_name_for(record_name: &str) -> String {
    record_name.replacen("/records/", "/logs/", 1)
}

/// First chunk of the latest TaskRun's log, which must be plain text.
pub async fn fetch_log(
    store: &dyn ResultsStore,
    namespace: &str,
    name: &str,
) -> Result<LogChunk, ResultsError> {
    let record = latest_record(store, namespace, name).await?;
    let log_name = log_name_for(&record.name);

    let mut stream = store.get_log(&log_name).await.map_err(|e| {
        ResultsError::remote(
            format!(
                "failed to get logs for TaskRun {} in namespace {}",
                name, namespace
            ),
            e,
        )
    })?;

    let receive_context = || {
        format!(
            "failed to receive streaming logs for TaskRun {} in namespace {}",
            name, namespace
        )
    };
    let chunk = stream
        .recv()
        .await
        .map_err(|e| ResultsError::remote(receive_context(), e))?
        .ok_or_else(|| ResultsError::remote(receive_context(), ClientError::EmptyStream))?;

    if chunk.content_type != PLAIN_TEXT {
        return Err(ResultsError::UnsupportedContent(chunk.content_type));
    }
    Ok(chunk)
}
