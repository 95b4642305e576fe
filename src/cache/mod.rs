// Cache module for the on-disk organization listing cache.

pub mod org_cache;
pub mod paths;
pub mod store;

pub use org_cache::{FetchMode, OrgCache, OrgCacheEntry};
pub use paths::{default_cache_dir, org_cache_path};
