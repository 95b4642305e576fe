// HTTP transport boundary.
// All network I/O goes through `HttpTransport` so the fetch engine can run against
// an in-memory transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ScanError;

/// The request methods the scanner issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
        }
    }
}

/// Header name/value pairs. Lookups are case-insensitive.
pub type HttpHeaders = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("request timed out: {url}")]
    Timeout { url: String },

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

impl From<HttpError> for ScanError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout { url } => ScanError::Timeout { url },
            other => ScanError::Transport(other.to_string()),
        }
    }
}

/// Transport boundary for all HTTP I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// reqwest-backed transport. One connection pool shared by every request issued
/// through this value; it is released when the last clone is dropped.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
        };

        let mut builder = self.client.request(method, &request.url);
        for (k, v) in &request.headers {
            builder = builder.header(k, v);
        }

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                HttpError::Timeout {
                    url: request.url.clone(),
                }
            } else {
                HttpError::Transport(e.to_string())
            }
        };

        let resp = builder.send().await.map_err(classify)?;

        let status = resp.status().as_u16();
        let headers: HttpHeaders = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        let body = resp.bytes().await.map_err(classify)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
pub use mock::MockTransport;

#[cfg(test)]
mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// In-memory transport: queued responses per method + URL, recorded requests,
    /// and an optional per-URL delay to reorder completions.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        inner: Arc<Mutex<Inner>>,
    }

    #[derive(Default)]
    struct Inner {
        routes: HashMap<(HttpMethod, String), VecDeque<HttpResponse>>,
        delays: HashMap<String, Duration>,
        requests: Vec<HttpRequest>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response. Multiple responses for one key are served FIFO.
        pub fn push_response(
            &self,
            method: HttpMethod,
            url: impl Into<String>,
            response: HttpResponse,
        ) {
            let mut inner = self.inner.lock().expect("mock lock poisoned");
            inner
                .routes
                .entry((method, url.into()))
                .or_default()
                .push_back(response);
        }

        /// Queue a 200 JSON response for a GET.
        pub fn push_json(&self, url: impl Into<String>, body: serde_json::Value) {
            self.push_json_with_headers(url, body, Vec::new());
        }

        pub fn push_json_with_headers(
            &self,
            url: impl Into<String>,
            body: serde_json::Value,
            headers: HttpHeaders,
        ) {
            self.push_response(
                HttpMethod::Get,
                url,
                HttpResponse {
                    status: 200,
                    headers,
                    body: serde_json::to_vec(&body).expect("serialize mock body"),
                },
            );
        }

        /// Queue a HEAD response carrying an ETag.
        pub fn push_etag(&self, url: impl Into<String>, etag: &str) {
            self.push_response(
                HttpMethod::Head,
                url,
                HttpResponse {
                    status: 200,
                    headers: vec![("ETag".to_string(), etag.to_string())],
                    body: Vec::new(),
                },
            );
        }

        pub fn set_delay(&self, url: impl Into<String>, delay: Duration) {
            let mut inner = self.inner.lock().expect("mock lock poisoned");
            inner.delays.insert(url.into(), delay);
        }

        #[must_use]
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.inner.lock().expect("mock lock poisoned").requests.clone()
        }

        #[must_use]
        pub fn count(&self, method: HttpMethod, url: &str) -> usize {
            self.requests()
                .iter()
                .filter(|r| r.method == method && r.url == url)
                .count()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let (response, delay) = {
                let mut inner = self.inner.lock().expect("mock lock poisoned");
                let key = (request.method, request.url.clone());
                let delay = inner.delays.get(&request.url).copied();
                inner.requests.push(request);
                let response = inner.routes.get_mut(&key).and_then(|q| q.pop_front());
                let response = response.ok_or(HttpError::NoMockResponse {
                    method: key.0.as_str().to_string(),
                    url: key.1,
                });
                (response, delay)
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            response
        }
    }
}
