//! Repository Content Gateway
//!
//! Front door to the hosting provider: a TTL-cached tree listing plus
//! batched, failure-tolerant content fetching. The gateway reports
//! per-file progress over a channel so the orchestrator can re-emit it as
//! `status`/`file` events without knowing the batching strategy.

mod cache;
mod provider;

pub use cache::{Clock, SystemClock, TreeCache};
pub use provider::{DEFAULT_API_BASE, GitHubProvider, HostingProvider};

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::constants::gateway;
use crate::types::{FetchedFile, FileTreeEntry, LensError, RepoRef, Result};

/// Per-file notification emitted while a content batch runs. `processed`
/// counts every resolved fetch, success or failure.
#[derive(Debug, Clone)]
pub struct FetchProgress {
    pub processed: usize,
    pub total: usize,
    pub path: String,
    pub ok: bool,
}

/// Result of one `get_file_contents` call. `matched_count` is the number
/// of requested paths before the max-files cap was applied.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub fetched: Vec<FetchedFile>,
    pub matched_count: usize,
}

pub struct ContentGateway {
    provider: Arc<dyn HostingProvider>,
    cache: TreeCache,
}

impl ContentGateway {
    pub fn new(provider: Arc<dyn HostingProvider>) -> Self {
        Self::with_cache(provider, TreeCache::default())
    }

    pub fn with_cache(provider: Arc<dyn HostingProvider>, cache: TreeCache) -> Self {
        Self { provider, cache }
    }

    pub fn has_credential(&self) -> bool {
        self.provider.has_credential()
    }

    pub async fn get_metadata(&self, repo: &RepoRef) -> Result<crate::types::RepoMetadata> {
        self.provider.get_metadata(repo).await
    }

    /// Recursive blob listing for one branch. Served from cache within the
    /// TTL window; a miss costs exactly one listing call.
    pub async fn get_file_tree(
        &self,
        repo: &RepoRef,
        branch: &str,
    ) -> Result<Arc<Vec<FileTreeEntry>>> {
        if let Some(cached) = self.cache.get(repo, branch) {
            debug!(%repo, branch, entries = cached.len(), "tree cache hit");
            return Ok(cached);
        }

        let entries = self.provider.get_tree(repo, branch).await?;
        if entries.is_empty() {
            return Err(LensError::RepoEmpty {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
            });
        }
        debug!(%repo, branch, entries = entries.len(), "tree fetched");
        Ok(self.cache.insert(repo, branch, entries))
    }

    /// Fetch the contents of up to `max_files` of the given paths.
    ///
    /// Paths are taken in the order supplied (callers pre-sort by
    /// relevance). Fetches run in fixed-size concurrent batches with a
    /// short pause between batches. A single file failing is logged,
    /// dropped from the result, and never fails the call.
    pub async fn get_file_contents(
        &self,
        repo: &RepoRef,
        paths: &[String],
        max_files: usize,
        progress: Option<mpsc::Sender<FetchProgress>>,
    ) -> Result<FetchOutcome> {
        let matched_count = paths.len();
        let selected = &paths[..paths.len().min(max_files)];
        let total = selected.len();

        let mut fetched = Vec::with_capacity(total);
        let mut processed = 0usize;

        for (batch_index, batch) in selected.chunks(gateway::FETCH_BATCH_SIZE).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(Duration::from_millis(gateway::BATCH_DELAY_MS)).await;
            }

            let results = join_all(batch.iter().map(|path| async move {
                (path, self.provider.get_file_content(repo, path).await)
            }))
            .await;

            for (path, result) in results {
                processed += 1;
                let ok = match result {
                    Ok(content) => {
                        fetched.push(FetchedFile {
                            path: path.clone(),
                            size: content.len(),
                            content,
                        });
                        true
                    }
                    Err(err) => {
                        warn!(%repo, path, %err, "file fetch failed, dropping from batch");
                        false
                    }
                };

                if let Some(tx) = &progress {
                    // Receiver gone means nobody is listening anymore.
                    let _ = tx
                        .send(FetchProgress {
                            processed,
                            total,
                            path: path.clone(),
                            ok,
                        })
                        .await;
                }
            }
        }

        Ok(FetchOutcome {
            fetched,
            matched_count,
        })
    }
}
