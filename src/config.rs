// Runtime settings from command-line flags, then environment variables, then defaults.
// The cache directory falls back to the platform cache dir, then the working directory.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::cache::{FetchMode, default_cache_dir};
use crate::error::{Result, ScanError};
use crate::github::client::DEFAULT_MAX_CONCURRENCY;

#[derive(Debug, Parser)]
#[command(name = "classroom-scanner")]
#[command(version)]
#[command(about = "Scan a GitHub organization's assignment repositories")]
#[command(after_long_help = r#"EXAMPLES
    List gradable repositories for an assignment:
        $ classroom-scanner --org Rice-COMP-215 --prefix hw1 repos

    Show CI status of each submission:
        $ classroom-scanner --org Rice-COMP-215 --prefix hw1 status

    Show team members behind each repository, excluding staff:
        $ classroom-scanner --org Rice-COMP-310 --prefix final --ignore prof,ta1 teams

ENVIRONMENT VARIABLES
    GITHUB_TOKEN                   GitHub personal access token
    GITHUB_ORG                     Default organization
    CLASSROOM_SCANNER_CACHE_DIR    Directory holding the per-organization cache files
    RUST_LOG                       Log filter (default: classroom_scanner=info)
"#)]
pub struct Cli {
    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, default_value = "", global = true)]
    pub token: String,

    /// GitHub organization to scan
    #[arg(long, env = "GITHUB_ORG", global = true)]
    pub org: Option<String>,

    /// Prefix on repository names to match (default: match all)
    #[arg(long, default_value = "", global = true)]
    pub prefix: String,

    /// Student ids to leave out, comma separated or repeated
    #[arg(long, value_delimiter = ',', global = true)]
    pub ignore: Vec<String>,

    /// Directory for cached organization listings
    #[arg(long, env = "CLASSROOM_SCANNER_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Maximum concurrent requests within one batch
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY, global = true)]
    pub max_concurrency: usize,

    /// Page through the organization listing one page at a time
    #[arg(long, global = true)]
    pub sequential: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List gradable repositories grouped by student
    Repos,
    /// Show the team members behind each gradable repository
    Teams,
    /// Show the CI check-suite conclusion of each gradable repository
    Status,
    /// Show the API rate limit for the token
    RateLimit,
    /// List the organization's teams
    OrgTeams,
    /// List the members of one team
    TeamMembers {
        /// Team slug (see `org-teams`)
        slug: String,
    },
    /// List commits pushed to repositories of the organization
    Events {
        /// Repository names within the organization
        #[arg(required = true)]
        repos: Vec<String>,
    },
    /// Show when each gradable repository's CI results arrived, with a running pass count
    Timeline {
        /// Only check suites on this ref count
        #[arg(long, default_value = DEFAULT_TIMELINE_REF)]
        branch: String,
    },
}

pub const DEFAULT_TIMELINE_REF: &str = "refs/heads/master";

impl Cli {
    pub fn require_org(&self) -> Result<&str> {
        self.org
            .as_deref()
            .filter(|org| !org.is_empty())
            .ok_or(ScanError::MissingSetting("--org (or GITHUB_ORG)"))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(default_cache_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn fetch_mode(&self) -> FetchMode {
        if self.sequential {
            FetchMode::Sequential
        } else {
            FetchMode::Parallel
        }
    }
}
