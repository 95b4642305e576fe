// Library root: cached, paginated and concurrent scanning of a GitHub organization's
// repositories, plus the queries classroom tooling builds on it.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod queries;

pub use cache::{FetchMode, OrgCache, OrgCacheEntry};
pub use error::{Result, ScanError};
pub use github::{BatchRequest, BatchResponse, GitHubClient, Record, RecordExt};
