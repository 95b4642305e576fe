// Per-organization cache of the repository listing, validated by the listing's ETag.
// Entries load lazily once per organization and are written back only after a non-empty re-fetch.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ScanError};
use crate::github::endpoints::org_repos_path;
use crate::github::{GitHubClient, Record};

use super::paths::org_cache_path;
use super::store;

/// How the full listing is paged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    Sequential,
    #[default]
    Parallel,
}

/// A validator token and the snapshot captured with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgCacheEntry {
    pub validator_token: String,
    pub snapshot: Vec<Record>,
}

/// Organization listing cache. Owned by the caller for the life of the program;
/// `&mut self` on the fetch keeps mutation out of any concurrent phase.
#[derive(Debug)]
pub struct OrgCache {
    dir: PathBuf,
    mode: FetchMode,
    entries: HashMap<String, OrgCacheEntry>,
    loaded: HashSet<String>,
}

impl OrgCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            mode: FetchMode::default(),
            entries: HashMap::new(),
            loaded: HashSet::new(),
        }
    }

    pub fn with_fetch_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry(&self, org: &str) -> Option<&OrgCacheEntry> {
        self.entries.get(org)
    }

    /// Load the persisted entry for `org`, once per process.
    ///
    /// Unreadable files count as a miss; a file that reads but does not decode
    /// is an error.
    fn load(&mut self, org: &str) -> Result<()> {
        if !self.loaded.insert(org.to_string()) {
            return Ok(());
        }

        let path = org_cache_path(&self.dir, org);
        match store::read_json::<OrgCacheEntry>(&path) {
            Ok(Some(entry)) => {
                info!(org, repos = entry.snapshot.len(), "restored cache");
                self.entries.insert(org.to_string(), entry);
            }
            Ok(None) => debug!(org, path = %path.display(), "no persisted cache"),
            Err(err @ ScanError::CorruptCache { .. }) => return Err(err),
            Err(err) => {
                warn!(org, path = %path.display(), error = %err, "cannot read cache, ignoring it")
            }
        }
        Ok(())
    }

    fn persist(&self, org: &str, entry: &OrgCacheEntry) {
        let path = org_cache_path(&self.dir, org);
        match store::write_json(&path, entry) {
            Ok(()) => info!(org, path = %path.display(), "wrote cache"),
            Err(err) => warn!(org, path = %path.display(), error = %err, "cannot write cache"),
        }
    }

    /// Every repository of `org`, from cache when the listing's ETag is unchanged.
    #[instrument(skip(self, client))]
    pub async fn get_org_repos(&mut self, client: &GitHubClient, org: &str) -> Result<Vec<Record>> {
        self.load(org)?;

        let locator = org_repos_path(org);
        let head = client.head(&locator).await?;
        let current = head.header("etag").map(str::to_string);

        if let (Some(current), Some(entry)) = (&current, self.entries.get(org))
            && entry.validator_token == *current
        {
            info!(org, "cached result is current");
            return Ok(entry.snapshot.clone());
        }
        info!(org, "cached result is missing or outdated");

        let snapshot = match self.mode {
            FetchMode::Sequential => client.fetch_all_pages(&locator).await?,
            FetchMode::Parallel => client.fetch_all_pages_parallel(&locator).await?,
        };
        info!(org, repos = snapshot.len(), "fetched repository listing");

        let Some(validator_token) = current else {
            warn!(org, "listing has no ETag, result not cached");
            return Ok(snapshot);
        };

        let entry = OrgCacheEntry {
            validator_token,
            snapshot,
        };
        if entry.snapshot.is_empty() {
            warn!(org, "empty listing, keeping the persisted cache");
        } else {
            self.persist(org, &entry);
        }
        let snapshot = entry.snapshot.clone();
        self.entries.insert(org.to_string(), entry);
        Ok(snapshot)
    }
}
