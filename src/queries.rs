// Queries derived from the cached repository listing.
// Repository names follow `<prefix>-<student id>`, optionally with a `-<digits>` setup suffix.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::github::endpoints::{check_suites_path, repo_refs_path};
use crate::github::types::strip_uri_template;
use crate::github::{BatchRequest, GitHubClient, Record, RecordExt};

/// Bucket for repositories without any check suite.
pub const MISSING: &str = "MISSING";

/// Repositories whose name starts with `prefix` (case-sensitive).
pub fn filter_by_prefix(repos: &[Record], prefix: &str) -> Vec<Record> {
    repos
        .iter()
        .filter(|repo| repo.name().is_some_and(|name| name.starts_with(prefix)))
        .cloned()
        .collect()
}

/// Student id embedded in `repo_name`, lower-cased, or `""` when the name does
/// not have the `<prefix>-` shape. An empty prefix matches every name, and the
/// whole name (less any setup suffix) is the id.
pub fn extract_student_id(prefix: &str, repo_name: &str) -> String {
    let rest = if prefix.is_empty() {
        Some(repo_name)
    } else {
        repo_name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
    };
    let Some(rest) = rest.filter(|rest| !rest.is_empty()) else {
        return String::new();
    };

    let id = match rest.rsplit_once('-') {
        Some((head, tail))
            if !head.is_empty()
                && !tail.is_empty()
                && tail.bytes().all(|b| b.is_ascii_digit()) =>
        {
            head
        }
        _ => rest,
    };
    id.to_lowercase()
}

/// Whether `repo_name` belongs to a student who should be graded.
pub fn is_gradable<S: AsRef<str>>(prefix: &str, ignore_list: &[S], repo_name: &str) -> bool {
    let id = extract_student_id(prefix, repo_name);
    !id.is_empty()
        && repo_name.starts_with(prefix)
        && repo_name != prefix
        && !ignore_list
            .iter()
            .any(|ignored| ignored.as_ref().to_lowercase() == id)
}

/// Prefix-matching repositories that pass `is_gradable`.
pub fn gradable_repos<S: AsRef<str>>(
    repos: &[Record],
    prefix: &str,
    ignore_list: &[S],
) -> Vec<Record> {
    filter_by_prefix(repos, prefix)
        .into_iter()
        .filter(|repo| {
            repo.name()
                .is_some_and(|name| is_gradable(prefix, ignore_list, name))
        })
        .collect()
}

/// Gradable repositories grouped by student id. More than one repository under
/// an id means the student set up the assignment more than once.
pub fn group_by_student(prefix: &str, repos: &[Record]) -> BTreeMap<String, Vec<Record>> {
    let mut groups: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for repo in repos {
        let Some(name) = repo.name() else { continue };
        let id = extract_student_id(prefix, name);
        if id.is_empty() {
            continue;
        }
        groups.entry(id).or_default().push(repo.clone());
    }
    for (id, group) in &groups {
        if group.len() > 1 {
            warn!(%id, count = group.len(), "student has more than one repository");
        }
    }
    groups
}

/// Members of the team owning each repository, keyed by repository full name.
///
/// Each repository is assumed to have at most one team; repositories without a
/// team map to an empty set. Logins are lower-cased.
#[instrument(skip_all, fields(repos = repos.len()))]
pub async fn get_team_memberships(
    client: &GitHubClient,
    repos: &[Record],
) -> Result<HashMap<String, BTreeSet<String>>> {
    let mut team_requests = Vec::with_capacity(repos.len());
    for repo in repos {
        team_requests.push(BatchRequest::new(
            repo.require_str("full_name")?,
            repo.require_str("teams_url")?,
        ));
    }
    let teams = client.fetch_many(team_requests).await?;

    let mut memberships: HashMap<String, BTreeSet<String>> = HashMap::with_capacity(teams.len());
    let mut member_requests = Vec::new();
    for (repo, response) in &teams {
        memberships.insert(repo.clone(), BTreeSet::new());

        let Some(team) = response.body.as_array().and_then(|teams| teams.first()) else {
            debug!(%repo, "no team");
            continue;
        };
        if response.body.as_array().is_some_and(|teams| teams.len() > 1) {
            warn!(%repo, "repository has more than one team, using the first");
        }
        let members_url = team.require_str("members_url")?;
        member_requests.push(BatchRequest::new(repo.clone(), strip_uri_template(members_url)));
    }

    let members = client.fetch_many(member_requests).await?;
    for (repo, response) in members {
        let logins: BTreeSet<String> = response
            .body
            .as_array()
            .map(|members| {
                members
                    .iter()
                    .filter_map(|member| member.login())
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default();
        memberships.insert(repo, logins);
    }

    info!(repos = memberships.len(), "resolved team memberships");
    Ok(memberships)
}

/// Latest CI outcome of a repository's head commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Completed {
        conclusion: String,
        head_sha: String,
        created_at: Option<DateTime<Utc>>,
    },
    Missing,
}

impl CheckStatus {
    /// Name of the bucket this status counts under.
    pub fn bucket(&self) -> &str {
        match self {
            CheckStatus::Completed { conclusion, .. } => conclusion,
            CheckStatus::Missing => MISSING,
        }
    }

    fn from_check_suites(body: &Record) -> Self {
        let Some(suite) = body
            .get("check_suites")
            .and_then(|suites| suites.as_array())
            .and_then(|suites| suites.first())
        else {
            return CheckStatus::Missing;
        };

        CheckStatus::Completed {
            conclusion: suite.str_field("conclusion").unwrap_or("pending").to_string(),
            head_sha: suite
                .str_field("head_sha")
                .map(short_sha)
                .unwrap_or_default()
                .to_string(),
            created_at: suite
                .str_field("created_at")
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Check-suite status of each repository's first ref, keyed by full name.
///
/// Two chained batches: refs per repository, then check suites per head commit.
pub async fn get_check_statuses(
    client: &GitHubClient,
    repos: &[Record],
) -> Result<BTreeMap<String, CheckStatus>> {
    get_branch_check_statuses(client, repos, None).await
}

/// Like `get_check_statuses`, but when `ref_name` is given (e.g.
/// `refs/heads/master`) only that ref counts; repositories without it are
/// `Missing`.
#[instrument(skip_all, fields(repos = repos.len(), ref_name))]
pub async fn get_branch_check_statuses(
    client: &GitHubClient,
    repos: &[Record],
    ref_name: Option<&str>,
) -> Result<BTreeMap<String, CheckStatus>> {
    let mut ref_requests = Vec::with_capacity(repos.len());
    for repo in repos {
        let full_name = repo.require_str("full_name")?;
        ref_requests.push(BatchRequest::new(full_name, repo_refs_path(full_name)));
    }
    let refs = client.fetch_many(ref_requests).await?;

    let mut statuses = BTreeMap::new();
    let mut suite_requests = Vec::new();
    for (repo, response) in &refs {
        let sha = response
            .body
            .as_array()
            .and_then(|refs| match ref_name {
                Some(wanted) => refs.iter().find(|r| r.str_field("ref") == Some(wanted)),
                None => refs.first(),
            })
            .and_then(|head| head.get("object"))
            .and_then(|object| object.str_field("sha"));
        match sha {
            Some(sha) => suite_requests.push(BatchRequest::new(
                repo.clone(),
                check_suites_path(repo, short_sha(sha)),
            )),
            None => {
                statuses.insert(repo.clone(), CheckStatus::Missing);
            }
        }
    }

    let suites = client.fetch_many(suite_requests).await?;
    for (repo, response) in suites {
        statuses.insert(repo, CheckStatus::from_check_suites(&response.body));
    }
    Ok(statuses)
}

/// Count statuses per bucket. The `MISSING` bucket is always present.
pub fn count_conclusions<'a>(
    statuses: impl IntoIterator<Item = &'a CheckStatus>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::from([(MISSING.to_string(), 0)]);
    for status in statuses {
        *counts.entry(status.bucket().to_string()).or_default() += 1;
    }
    counts
}

/// One check-suite result on the completion timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePoint {
    pub at: DateTime<Utc>,
    pub repo: String,
    pub conclusion: String,
    /// Repositories whose latest result so far is `success`.
    pub passing: usize,
}

/// Chronological check-suite results with a running count of passing
/// repositories. A head commit shared by several repositories counts once, for
/// the first repository by name; results without a timestamp are skipped.
pub fn completion_timeline(statuses: &BTreeMap<String, CheckStatus>) -> Vec<TimelinePoint> {
    let mut shas_seen = HashSet::new();
    let mut results = Vec::new();
    for (repo, status) in statuses {
        let CheckStatus::Completed {
            conclusion,
            head_sha,
            created_at: Some(at),
        } = status
        else {
            continue;
        };
        if !shas_seen.insert(head_sha.as_str()) {
            debug!(%repo, %head_sha, "commit already on the timeline");
            continue;
        }
        results.push((*at, repo, conclusion));
    }
    results.sort_by_key(|(at, _, _)| *at);

    let mut passing: HashMap<&str, bool> = HashMap::new();
    results
        .into_iter()
        .map(|(at, repo, conclusion)| {
            passing.insert(repo, conclusion == "success");
            TimelinePoint {
                at,
                repo: repo.clone(),
                conclusion: conclusion.clone(),
                passing: passing.values().filter(|p| **p).count(),
            }
        })
        .collect()
}

/// One commit delivered by a push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCommit {
    pub login: String,
    /// First 7 characters, as GitHub shows commit ids on the web.
    pub sha: String,
    /// First line of the commit message.
    pub message: String,
    pub pushed_at: DateTime<Utc>,
}

/// Commits from the `PushEvent`s in a repository event list, in event order.
/// Malformed push events are logged and skipped.
pub fn push_commits(events: &[Record]) -> Vec<PushCommit> {
    let mut commits = Vec::new();
    for event in events {
        if event.str_field("type") != Some("PushEvent") {
            continue;
        }
        let login = event.get("actor").and_then(|actor| actor.login());
        let pushed_at = event
            .str_field("created_at")
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let pushed = event
            .get("payload")
            .and_then(|payload| payload.get("commits"))
            .and_then(|commits| commits.as_array());

        let (Some(login), Some(pushed_at), Some(pushed)) = (login, pushed_at, pushed) else {
            warn!(id = event.str_field("id").unwrap_or("?"), "malformed push event");
            continue;
        };
        for commit in pushed {
            let (Some(sha), Some(message)) = (commit.str_field("sha"), commit.str_field("message"))
            else {
                warn!(login, "malformed commit in push event");
                continue;
            };
            commits.push(PushCommit {
                login: login.to_string(),
                sha: short_sha(sha).to_string(),
                message: message.lines().next().unwrap_or("").to_string(),
                pushed_at,
            });
        }
    }
    commits
}

/// Pushed commits of one repository, from all pages of its event list.
pub async fn get_push_events(client: &GitHubClient, full_name: &str) -> Result<Vec<PushCommit>> {
    let events = client.get_repo_events(full_name).await?;
    Ok(push_commits(&events))
}
