//! File-Tree Cache
//!
//! Write-once-per-TTL-window cache of recursive tree listings, keyed by
//! (owner, name, branch). Entries are immutable once written, so readers
//! need no locking beyond the map's own sharding; two concurrent misses
//! both fetching and both writing is a tolerated race (the values are
//! equivalent, last write wins).
//!
//! The clock is injected so tests can expire entries without sleeping.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::gateway;
use crate::types::{FileTreeEntry, RepoRef};

/// Time source for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TreeKey {
    owner: String,
    name: String,
    branch: String,
}

impl TreeKey {
    fn new(repo: &RepoRef, branch: &str) -> Self {
        Self {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            branch: branch.to_string(),
        }
    }
}

struct CachedTree {
    fetched_at: Instant,
    entries: Arc<Vec<FileTreeEntry>>,
}

pub struct TreeCache {
    entries: DashMap<TreeKey, CachedTree>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for TreeCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(gateway::TREE_CACHE_TTL_SECS))
    }
}

impl TreeCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// A listing younger than the TTL, or None. Expired entries are never
    /// served; they stay in place until the next insert overwrites them.
    pub fn get(&self, repo: &RepoRef, branch: &str) -> Option<Arc<Vec<FileTreeEntry>>> {
        let cached = self.entries.get(&TreeKey::new(repo, branch))?;
        if self.clock.now().duration_since(cached.fetched_at) < self.ttl {
            Some(cached.entries.clone())
        } else {
            None
        }
    }

    pub fn insert(
        &self,
        repo: &RepoRef,
        branch: &str,
        entries: Vec<FileTreeEntry>,
    ) -> Arc<Vec<FileTreeEntry>> {
        let entries = Arc::new(entries);
        self.entries.insert(
            TreeKey::new(repo, branch),
            CachedTree {
                fetched_at: self.clock.now(),
                entries: entries.clone(),
            },
        );
        entries
    }
}
