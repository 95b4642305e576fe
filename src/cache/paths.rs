// Cache path utilities.
// One JSON file per organization inside the cache directory.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Platform cache directory (~/.cache/classroom-scanner on Linux).
pub fn default_cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "classroom-scanner").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path of the persisted repository listing for an organization.
pub fn org_cache_path(dir: &Path, org: &str) -> PathBuf {
    dir.join(format!("org-{}.json", sanitize_name(org)))
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("simple"), "simple");
        assert_eq!(sanitize_name("with/slash"), "with_slash");
        assert_eq!(sanitize_name("owner:name"), "owner_name");
    }

    #[test]
    fn test_org_cache_path_is_deterministic() {
        let dir = Path::new("/tmp/scan");
        assert_eq!(
            org_cache_path(dir, "Rice-COMP-310"),
            PathBuf::from("/tmp/scan/org-Rice-COMP-310.json")
        );
        assert_eq!(org_cache_path(dir, "a/b"), org_cache_path(dir, "a/b"));
        assert!(org_cache_path(dir, "a/b").ends_with("org-a_b.json"));
    }
}
