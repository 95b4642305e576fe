// Error types for the scanner.
// Covers configuration, HTTP status/transport failures, and cache I/O.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Missing GitHub token: pass --token or set the GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error(
        "Request failed, status code: {status}\nURL: {url}\nHeaders: {headers}\nBody: {body}"
    )]
    Status {
        status: u16,
        url: String,
        headers: String,
        body: String,
    },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache file {}: {source}", path.display())]
    CorruptCache {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unexpected response shape from {url}: expected {expected}")]
    UnexpectedShape { url: String, expected: &'static str },

    #[error("Missing field `{field}` in {context}")]
    MissingField { field: &'static str, context: String },
}

pub type Result<T> = std::result::Result<T, ScanError>;
