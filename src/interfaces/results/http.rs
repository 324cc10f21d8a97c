use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use super::{
    ClientError, ListRecordsRequest, ListRecordsResponse, ListResultsRequest, ListResultsResponse,
    LogChunk, LogStream, ResultsStore,
};

const API_PREFIX: &str = "apis/results.tekton.dev/v1alpha2/parents";

/// Results store reached through its JSON/HTTP gateway.
pub struct HttpResultsStore {
    client: Client,
    api_url: String,
}

impl HttpResultsStore {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// `<api>/apis/.../parents/<name>[/<suffix>]`, escaping each segment
    /// of the resource name.
    fn url(&self, name: &str, suffix: Option<&str>) -> String {
        let path: Vec<String> = name
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        let mut url = format!("{}/{}/{}", self.api_url, API_PREFIX, path.join("/"));
        if let Some(suffix) = suffix {
            url.push('/');
            url.push_str(suffix);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let resp = check_status(request.send().await?).await?;
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

fn list_query(filter: &str, order_by: &str, page_size: i32) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if !filter.is_empty() {
        query.push(("filter", filter.to_string()));
    }
    if !order_by.is_empty() {
        query.push(("order_by", order_by.to_string()));
    }
    if page_size > 0 {
        query.push(("page_size", page_size.to_string()));
    }
    query
}

#[derive(Deserialize)]
struct GatewayError {
    #[serde(default)]
    message: String,
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GatewayError>(&text)
        .map(|e| e.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(text);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ResultsStore for HttpResultsStore {
    async fn list_results(
        &self,
        request: &ListResultsRequest,
    ) -> Result<ListResultsResponse, ClientError> {
        let url = self.url(&request.parent, Some("results"));
        debug!(%url, filter = %request.filter, "listing results");
        let query = list_query(&request.filter, &request.order_by, request.page_size);
        self.get_json(self.client.get(&url).query(&query)).await
    }

    async fn list_records(
        &self,
        request: &ListRecordsRequest,
    ) -> Result<ListRecordsResponse, ClientError> {
        let url = self.url(&request.parent, Some("records"));
        debug!(%url, filter = %request.filter, "listing records");
        let query = list_query(&request.filter, &request.order_by, request.page_size);
        self.get_json(self.client.get(&url).query(&query)).await
    }

    async fn get_log(&self, name: &str) -> Result<Box<dyn LogStream>, ClientError> {
        let url = self.url(name, None);
        debug!(%url, "opening log stream");
        let resp = check_status(self.client.get(&url).send().await?).await?;
        let content_type = media_type(resp.headers().get(CONTENT_TYPE));
        debug!(%content_type, "log stream opened");
        Ok(Box::new(HttpLogStream {
            content_type,
            body: Box::pin(resp.bytes_stream()),
        }))
    }
}

/// Media type of a `Content-Type` header without its parameters.
fn media_type(header: Option<&HeaderValue>) -> String {
    header
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Raw log body. Every non-empty chunk of the response is one [`LogChunk`]
/// carrying the response's media type.
struct HttpLogStream {
    content_type: String,
    body: ByteStream,
}

#[async_trait]
impl LogStream for HttpLogStream {
    async fn recv(&mut self) -> Result<Option<LogChunk>, ClientError> {
        while let Some(part) = self.body.next().await {
            let data = part?;
            if data.is_empty() {
                continue;
            }
            return Ok(Some(LogChunk {
                content_type: self.content_type.clone(),
                data: data.to_vec(),
            }));
        }
        Ok(None)
    }
}
