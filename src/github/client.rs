// GitHub API HTTP client.
// Builds the request header set, resolves endpoint locators, and validates responses.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{Result, ScanError};

use super::http::{
    HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "classroom-scanner/0.1";
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Check-suite data sits behind the antiope preview, team membership behind hellcat.
const ACCEPT: &str = "application/vnd.github+json, \
application/vnd.github.antiope-preview+json, \
application/vnd.github.hellcat-preview+json";

/// Build the headers every request carries. An empty token is a configuration error.
pub fn build_auth_headers(token: &str) -> Result<HttpHeaders> {
    if token.trim().is_empty() {
        return Err(ScanError::MissingToken);
    }

    let auth = format!("Bearer {}", token.trim());
    HeaderValue::from_str(&auth).map_err(|e| ScanError::InvalidHeader(e.to_string()))?;

    Ok(vec![
        ("Authorization".to_string(), auth),
        ("Accept".to_string(), ACCEPT.to_string()),
        ("X-GitHub-Api-Version".to_string(), GITHUB_API_VERSION.to_string()),
        ("User-Agent".to_string(), USER_AGENT.to_string()),
    ])
}

/// Anything but 200 is a failure carrying status, headers and body.
pub fn check_response_ok(url: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.status == 200 {
        return Ok(response);
    }

    let headers: serde_json::Map<String, Value> = response
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let headers = serde_json::to_string_pretty(&headers).unwrap_or_default();

    let body = match serde_json::from_slice::<Value>(&response.body) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_default(),
        Err(_) => String::from_utf8_lossy(&response.body).into_owned(),
    };

    Err(ScanError::Status {
        status: response.status,
        url: url.to_string(),
        headers,
        body,
    })
}

/// Append or extend a query string with `page=<n>`.
pub fn with_page(url: &str, page: u32) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", url, sep, page)
}

/// GitHub API client over a pluggable transport.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    headers: HttpHeaders,
    base: String,
    max_concurrency: usize,
}

impl GitHubClient {
    /// Create a reqwest-backed client with a per-request timeout.
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(timeout)?;
        Self::with_transport(token, Arc::new(transport))
    }

    pub fn with_transport(token: &str, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Ok(Self {
            transport,
            headers: build_auth_headers(token)?,
            base: GITHUB_API_BASE.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        })
    }

    /// Cap the number of requests in flight within one batch.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Absolute URLs pass through; anything else is joined onto the API base.
    pub fn resolve_url(&self, locator: &str) -> String {
        if locator.starts_with("https://") || locator.starts_with("http://") {
            locator.to_string()
        } else {
            format!("{}/{}", self.base, locator.trim_start_matches('/'))
        }
    }

    async fn send(&self, method: HttpMethod, locator: &str) -> Result<HttpResponse> {
        let url = self.resolve_url(locator);
        debug!(method = method.as_str(), %url, "request");
        let response = self
            .transport
            .send(HttpRequest {
                method,
                url: url.clone(),
                headers: self.headers.clone(),
            })
            .await?;
        check_response_ok(&url, response)
    }

    /// GET, validated.
    pub async fn get(&self, locator: &str) -> Result<HttpResponse> {
        self.send(HttpMethod::Get, locator).await
    }

    /// HEAD, validated. Used to read validators without a body.
    pub async fn head(&self, locator: &str) -> Result<HttpResponse> {
        self.send(HttpMethod::Head, locator).await
    }

    /// Fetch one JSON resource.
    #[instrument(skip(self))]
    pub async fn fetch_json(&self, locator: &str) -> Result<Value> {
        let response = self.get(locator).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::http::{MockTransport, header_get};

    fn client(transport: &MockTransport) -> GitHubClient {
        GitHubClient::with_transport("secret", Arc::new(transport.clone())).unwrap()
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(build_auth_headers(""), Err(ScanError::MissingToken)));
        assert!(matches!(build_auth_headers("   "), Err(ScanError::MissingToken)));
    }

    #[test]
    fn headers_carry_auth_agent_and_preview_accept() {
        let headers = build_auth_headers("abc").unwrap();
        assert_eq!(header_get(&headers, "authorization"), Some("Bearer abc"));
        assert!(header_get(&headers, "user-agent").is_some());
        let accept = header_get(&headers, "accept").unwrap();
        assert!(accept.contains("antiope-preview"));
        assert!(accept.contains("hellcat-preview"));
    }

    #[test]
    fn token_with_newline_is_invalid_header() {
        assert!(matches!(
            build_auth_headers("abc\ndef"),
            Err(ScanError::InvalidHeader(_))
        ));
    }

    #[test]
    fn non_200_reports_status_headers_and_body() {
        let response = HttpResponse {
            status: 404,
            headers: vec![("X-Request".to_string(), "1".to_string())],
            body: br#"{"message":"Not Found"}"#.to_vec(),
        };
        let err = check_response_ok("https://api.github.com/x", response).unwrap_err();
        match err {
            ScanError::Status {
                status,
                headers,
                body,
                ..
            } => {
                assert_eq!(status, 404);
                assert!(headers.contains("X-Request"));
                assert!(body.contains("Not Found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn created_is_not_ok() {
        let response = HttpResponse {
            status: 201,
            headers: Vec::new(),
            body: b"not json".to_vec(),
        };
        assert!(check_response_ok("u", response).is_err());
    }

    #[test]
    fn resolve_url_prefixes_relative_locators() {
        let transport = MockTransport::new();
        let client = client(&transport);
        assert_eq!(
            client.resolve_url("orgs/rice/repos"),
            "https://api.github.com/orgs/rice/repos"
        );
        assert_eq!(
            client.resolve_url("/rate_limit"),
            "https://api.github.com/rate_limit"
        );
        assert_eq!(
            client.resolve_url("https://api.github.com/teams/1/members"),
            "https://api.github.com/teams/1/members"
        );
    }

    #[test]
    fn with_page_picks_separator() {
        assert_eq!(with_page("https://a/b", 2), "https://a/b?page=2");
        assert_eq!(with_page("https://a/b?per_page=100", 3), "https://a/b?per_page=100&page=3");
    }

    #[tokio::test]
    async fn fetch_json_decodes_body() {
        let transport = MockTransport::new();
        transport.push_json(
            "https://api.github.com/repos/rice/hw1-alice",
            serde_json::json!({"name": "hw1-alice"}),
        );
        let value = client(&transport)
            .fetch_json("repos/rice/hw1-alice")
            .await
            .unwrap();
        assert_eq!(value["name"], "hw1-alice");

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(header_get(&sent[0].headers, "authorization"), Some("Bearer secret"));
    }
}
