// HTTP transport capability used by the pipeline.
// The orchestrator builds `HttpRequest`s and hands them to whatever `Transport` it
// was given: the reqwest-backed one in production, a scripted upstream in tests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::error::{ClientError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Form(Vec<(String, String)>),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    // Raw path segments, percent-encoded by the transport
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl HttpRequest {
    fn new(method: HttpMethod, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            bearer: None,
            body: RequestBody::Empty,
        }
    }

    pub fn get(segments: &[&str]) -> Self {
        Self::new(HttpMethod::Get, segments)
    }

    pub fn post(segments: &[&str]) -> Self {
        Self::new(HttpMethod::Post, segments)
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Unencoded path, e.g. `/v1/booking/flight-orders`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Human-readable summary of an upstream error body.
    pub fn error_message(&self) -> String {
        if let Ok(body) = self.json::<UpstreamErrorBody>() {
            if let Some(message) = body.summary() {
                return message;
            }
        }
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            text.chars().take(200).collect()
        }
    }
}

// Error bodies: `{"errors":[...]}` from the API, `{"error":...}` from the OAuth endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpstreamErrorBody {
    pub errors: Vec<UpstreamIssue>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpstreamIssue {
    pub status: Option<u16>,
    pub code: Option<u32>,
    pub title: Option<String>,
    pub detail: Option<String>,
}

impl UpstreamErrorBody {
    pub fn summary(&self) -> Option<String> {
        if let Some(issue) = self.errors.first() {
            let text = match (&issue.title, &issue.detail) {
                (Some(title), Some(detail)) => format!("{title}: {detail}"),
                (Some(text), None) | (None, Some(text)) => text.clone(),
                (None, None) => return issue.code.map(|code| format!("upstream code {code}")),
            };
            return Some(text);
        }
        match (&self.error, &self.error_description) {
            (Some(error), Some(description)) => Some(format!("{error}: {description}")),
            (Some(text), None) | (None, Some(text)) => Some(text.clone()),
            (None, None) => None,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    // One request/response exchange. Non-2xx statuses are responses, not errors.
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
    timeout_ms: u64,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::ConfigError(format!("invalid base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::ConfigError(format!(
                "base url {base_url} cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            timeout_ms,
        })
    }

    fn url_for(&self, request: &HttpRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidRequest("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(&request.segments);
        Ok(url)
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout_ms)
        } else if error.is_builder() {
            TransportError::InvalidRequest(error.to_string())
        } else {
            TransportError::NetworkError(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request)?;
        debug!("{} {}", request.method, url.path());

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Json(body) => builder.json(body),
        };

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        Ok(HttpResponse { status, body })
    }
}

// Scripted in-process upstream for tests
#[cfg(test)]
pub mod mock_upstream {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Route {
        method: HttpMethod,
        path: String,
        status: u16,
        body: Value,
        delay_ms: u64,
    }

    #[derive(Default)]
    pub struct MockUpstream {
        routes: Mutex<Vec<Route>>,
        requests: Mutex<Vec<HttpRequest>>,
        fail_next_requests: AtomicUsize,
    }

    impl MockUpstream {
        pub fn new() -> Self {
            Self::default()
        }

        // Later registrations for the same route win
        pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
            self.respond_after(method, path, status, body, 0);
        }

        pub fn respond_after(
            &self,
            method: HttpMethod,
            path: &str,
            status: u16,
            body: Value,
            delay_ms: u64,
        ) {
            self.routes.lock().push(Route {
                method,
                path: path.to_string(),
                status,
                body,
                delay_ms,
            });
        }

        /// Drop the connection for the next `count` requests.
        pub fn fail_next_requests(&self, count: usize) {
            self.fail_next_requests.store(count, Ordering::SeqCst);
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().clone()
        }

        pub fn count(&self, method: HttpMethod, path: &str) -> usize {
            self.requests
                .lock()
                .iter()
                .filter(|r| r.method == method && r.path() == path)
                .count()
        }

        pub fn last_request(&self, method: HttpMethod, path: &str) -> Option<HttpRequest> {
            self.requests
                .lock()
                .iter()
                .rev()
                .find(|r| r.method == method && r.path() == path)
                .cloned()
        }
    }

    #[async_trait]
    impl Transport for MockUpstream {
        async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().push(request.clone());

            let consumed_failure = self
                .fail_next_requests
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if consumed_failure {
                return Err(TransportError::NetworkError("connection reset".to_string()));
            }

            let matched = {
                let routes = self.routes.lock();
                let path = request.path();
                routes
                    .iter()
                    .rev()
                    .find(|route| route.method == request.method && route.path == path)
                    .map(|route| (route.status, route.body.to_string(), route.delay_ms))
            };

            match matched {
                Some((status, body, delay_ms)) => {
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    Ok(HttpResponse::new(status, body))
                }
                None => Ok(HttpResponse::new(
                    404,
                    serde_json::json!({
                        "errors": [{"status": 404, "code": 38196, "title": "Resource not found"}]
                    })
                    .to_string(),
                )),
            }
        }
    }
}
