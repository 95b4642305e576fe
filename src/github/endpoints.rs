// GitHub API endpoint paths and the small typed calls built on them.

use crate::error::Result;

use super::client::GitHubClient;
use super::types::{RateLimit, RateLimitResponse, Record};

/// Organization repository listing. The same locator serves the HEAD check and
/// the paged GET so both see the same validator.
pub fn org_repos_path(org: &str) -> String {
    format!("orgs/{}/repos?per_page=100", org)
}

pub fn org_teams_path(org: &str) -> String {
    format!("orgs/{}/teams?per_page=100", org)
}

pub fn team_members_path(org: &str, team_slug: &str) -> String {
    format!("orgs/{}/teams/{}/members?per_page=100", org, team_slug)
}

pub fn repo_refs_path(full_name: &str) -> String {
    format!("repos/{}/git/refs", full_name)
}

pub fn repo_events_path(full_name: &str) -> String {
    format!("repos/{}/events?per_page=100", full_name)
}

pub fn check_suites_path(full_name: &str, sha: &str) -> String {
    format!("repos/{}/commits/{}/check-suites", full_name, sha)
}

impl GitHubClient {
    /// Core API rate limit for the token in use.
    pub async fn get_rate_limit(&self) -> Result<RateLimit> {
        let body = self.fetch_json("rate_limit").await?;
        let parsed: RateLimitResponse = serde_json::from_value(body)?;
        Ok(parsed.resources.core)
    }

    /// All teams of an organization.
    pub async fn get_org_teams(&self, org: &str) -> Result<Vec<Record>> {
        self.fetch_all_pages_parallel(&org_teams_path(org)).await
    }

    /// Members of one team, addressed by slug.
    pub async fn get_team_members(&self, org: &str, team_slug: &str) -> Result<Vec<Record>> {
        self.fetch_all_pages_parallel(&team_members_path(org, team_slug))
            .await
    }

    /// Public events of one repository, all pages.
    pub async fn get_repo_events(&self, full_name: &str) -> Result<Vec<Record>> {
        self.fetch_all_pages_parallel(&repo_events_path(full_name))
            .await
    }
}
