// GitHub API module.
// Transport, client primitives, pagination, batch fetching and record accessors.

pub mod batch;
pub mod client;
pub mod endpoints;
pub mod http;
pub mod pagination;
pub mod types;

pub use batch::{BatchRequest, BatchResponse};
pub use client::{GitHubClient, build_auth_headers, check_response_ok};
pub use http::{HttpTransport, ReqwestTransport};
pub use pagination::parse_last_page;
pub use types::{RateLimit, Record, RecordExt};
