// GitHub API record types.
// Repository, team and member records stay loosely typed JSON; only the handful of
// fields the scanner reads get accessors, and each returns `None` when absent.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ScanError};

/// A repository, team or member record as returned by the API.
pub type Record = Value;

/// Named field access on loosely typed records.
pub trait RecordExt {
    /// String field, or `None` if missing or not a string.
    fn str_field(&self, field: &str) -> Option<&str>;

    /// String field that an operation cannot proceed without.
    fn require_str(&self, field: &'static str) -> Result<&str>;

    fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    fn full_name(&self) -> Option<&str> {
        self.str_field("full_name")
    }

    fn login(&self) -> Option<&str> {
        self.str_field("login")
    }

    /// Browser URL when present, API URL otherwise.
    fn final_url(&self) -> Option<&str> {
        self.str_field("html_url").or_else(|| self.str_field("url"))
    }
}

impl RecordExt for Value {
    fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    fn require_str(&self, field: &'static str) -> Result<&str> {
        self.str_field(field).ok_or_else(|| ScanError::MissingField {
            field,
            context: self
                .full_name()
                .or_else(|| self.name())
                .unwrap_or("record")
                .to_string(),
        })
    }
}

/// Strip the `{/member}`-style URI template suffix GitHub appends to some links.
pub fn strip_uri_template(url: &str) -> &str {
    match url.find('{') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Core rate limit bucket from `GET /rate_limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub used: Option<u64>,
    /// Epoch seconds at which the bucket refills.
    pub reset: i64,
}

impl RateLimit {
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.reset, 0)
    }

    pub fn reset_local(&self) -> String {
        self.reset_at()
            .map(|dt| dt.with_timezone(&Local).to_rfc2822())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResources {
    pub core: RateLimit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accessors_return_none_for_missing_or_mistyped_fields() {
        let repo = json!({"name": "hw1-alice", "full_name": 7});
        assert_eq!(repo.name(), Some("hw1-alice"));
        assert_eq!(repo.full_name(), None);
        assert_eq!(repo.login(), None);
    }

    #[test]
    fn final_url_prefers_html_url() {
        let both = json!({
            "html_url": "https://github.com/o/r",
            "url": "https://api.github.com/repos/o/r",
        });
        let api_only = json!({"url": "https://api.github.com/repos/o/r"});
        assert_eq!(both.final_url(), Some("https://github.com/o/r"));
        assert_eq!(api_only.final_url(), Some("https://api.github.com/repos/o/r"));
        assert_eq!(json!({}).final_url(), None);
    }

    #[test]
    fn require_str_names_the_record() {
        let repo = json!({"name": "hw1-bob"});
        match repo.require_str("teams_url") {
            Err(ScanError::MissingField { field, context }) => {
                assert_eq!(field, "teams_url");
                assert_eq!(context, "hw1-bob");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn strip_uri_template_suffix() {
        assert_eq!(
            strip_uri_template("https://api.github.com/teams/1/members{/member}"),
            "https://api.github.com/teams/1/members"
        );
        assert_eq!(strip_uri_template("https://x/y"), "https://x/y");
    }

    #[test]
    fn rate_limit_decodes_core_bucket() {
        let body = json!({
            "resources": {
                "core": {"limit": 5000, "remaining": 4999, "used": 1, "reset": 1700000000},
                "search": {"limit": 30, "remaining": 30, "reset": 1700000000}
            }
        });
        let parsed: RateLimitResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.resources.core.remaining, 4999);
        assert_eq!(parsed.resources.core.reset_at().unwrap().timestamp(), 1_700_000_000);
    }
}
