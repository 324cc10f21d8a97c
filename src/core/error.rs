use thiserror::Error;

use crate::interfaces::results::ClientError;

/// Failures while turning a stored payload into a [`TaskRun`](crate::core::model::TaskRun).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record {record}: unsupported data type '{data_type}'")]
    UnsupportedSchema { record: String, data_type: String },

    #[error("record {record}: failed to unmarshal TaskRun data: {source}")]
    Malformed {
        record: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("{context}: {source}")]
    RemoteCall {
        context: String,
        #[source]
        source: ClientError,
    },

    #[error("no {kind} found with name {name} in namespace {namespace}")]
    NotFound {
        kind: &'static str,
        name: String,
        namespace: String,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("{0}")]
    Usage(String),
}

impl ResultsError {
    pub fn remote(context: impl Into<String>, source: ClientError) -> Self {
        ResultsError::RemoteCall {
            context: context.into(),
            source,
        }
    }
}
