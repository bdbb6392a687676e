//! Pre-flight Operations
//!
//! Validation and cost estimation before any analysis run: both work from
//! repository metadata and the tree listing alone. No file content is
//! fetched and the AI service is never touched.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::classifier::Classifier;
use crate::constants::tiers;
use crate::cost::{PricingModel, estimate_output_tokens, estimate_tokens_from_size};
use crate::gateway::ContentGateway;
use crate::types::{LensError, PriorityTier, RepoMetadata, RepoRef, Result};

/// Listing-only estimate for one tier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierPreflight {
    pub tier: PriorityTier,
    /// Matched file count, capped at the per-tier maximum.
    pub matched_files: usize,
    pub estimated_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Full pre-flight estimate for a repository.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoEstimate {
    pub metadata: RepoMetadata,
    pub tiers: Vec<TierPreflight>,
}

impl RepoEstimate {
    pub fn total_estimated_cost(&self) -> f64 {
        self.tiers.iter().map(|t| t.estimated_cost_usd).sum()
    }
}

pub struct Preflight {
    gateway: Arc<ContentGateway>,
    classifier: Classifier,
    pricing: PricingModel,
    max_files_per_tier: usize,
}

impl Preflight {
    pub fn new(gateway: Arc<ContentGateway>, classifier: Classifier, pricing: PricingModel) -> Self {
        Self {
            gateway,
            classifier,
            pricing,
            max_files_per_tier: tiers::DEFAULT_MAX_FILES_PER_TIER,
        }
    }

    pub fn with_max_files(mut self, max_files_per_tier: usize) -> Self {
        self.max_files_per_tier = max_files_per_tier;
        self
    }

    /// Parse and resolve a repository URL to its metadata.
    pub async fn validate(&self, repository_url: &str) -> Result<RepoMetadata> {
        let repo = RepoRef::parse(repository_url)?;
        self.gateway.get_metadata(&repo).await
    }

    /// Per-tier cost estimate from the tree listing only. Token counts come
    /// from blob byte sizes through the chars/4 heuristic.
    pub async fn estimate(&self, repository_url: &str) -> Result<RepoEstimate> {
        let repo = RepoRef::parse(repository_url)?;
        let metadata = self.gateway.get_metadata(&repo).await?;
        if metadata.private && !self.gateway.has_credential() {
            return Err(LensError::PrivateRepo {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
            });
        }

        let tree = self
            .gateway
            .get_file_tree(&repo, &metadata.default_branch)
            .await?;

        let tiers = PriorityTier::ALL
            .into_iter()
            .map(|tier| {
                let matched = self.classifier.files_for_tier(&tree, tier);
                let capped = matched.len().min(self.max_files_per_tier);
                let input_tokens: u64 = matched
                    .iter()
                    .take(capped)
                    .map(|entry| estimate_tokens_from_size(entry.size))
                    .sum();
                let output_tokens = estimate_output_tokens(input_tokens);

                debug!(
                    %tier,
                    matched = matched.len(),
                    capped,
                    input_tokens,
                    "tier pre-flight estimate"
                );

                TierPreflight {
                    tier,
                    matched_files: capped,
                    estimated_tokens: input_tokens + output_tokens,
                    estimated_cost_usd: self.pricing.cost(input_tokens, output_tokens),
                }
            })
            .collect();

        Ok(RepoEstimate { metadata, tiers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::gateway::HostingProvider;
    use crate::types::FileTreeEntry;

    struct ListingHost {
        private: bool,
        tree: Vec<FileTreeEntry>,
        content_calls: AtomicUsize,
    }

    impl ListingHost {
        fn new(entries: &[(&str, u64)]) -> Self {
            Self {
                private: false,
                tree: entries
                    .iter()
                    .map(|(path, size)| FileTreeEntry {
                        path: path.to_string(),
                        size: *size,
                        sha: format!("sha-{}", path),
                    })
                    .collect(),
                content_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HostingProvider for ListingHost {
        async fn get_metadata(&self, repo: &RepoRef) -> Result<RepoMetadata> {
            Ok(RepoMetadata {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
                full_name: repo.to_string(),
                description: Some("fixture".to_string()),
                stars: 1,
                language: None,
                updated_at: chrono::Utc::now(),
                default_branch: "main".to_string(),
                private: self.private,
            })
        }

        async fn get_tree(&self, _repo: &RepoRef, _branch: &str) -> Result<Vec<FileTreeEntry>> {
            Ok(self.tree.clone())
        }

        async fn get_file_content(&self, _repo: &RepoRef, _path: &str) -> Result<String> {
            self.content_calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::new())
        }

        fn has_credential(&self) -> bool {
            false
        }
    }

    fn preflight(host: Arc<ListingHost>) -> Preflight {
        Preflight::new(
            Arc::new(ContentGateway::new(host)),
            Classifier::new(),
            PricingModel::default(),
        )
    }

    #[tokio::test]
    async fn test_validate_returns_metadata() {
        let host = Arc::new(ListingHost::new(&[(".env", 40)]));
        let metadata = preflight(host).validate("octocat/demo").await.unwrap();
        assert_eq!(metadata.full_name, "octocat/demo");
        assert_eq!(metadata.default_branch, "main");
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_url() {
        let host = Arc::new(ListingHost::new(&[]));
        let err = preflight(host).validate("not a url").await.unwrap_err();
        assert!(matches!(err, LensError::InvalidRepoUrl(_)));
    }

    #[tokio::test]
    async fn test_estimate_never_fetches_content() {
        let host = Arc::new(ListingHost::new(&[
            (".env", 40),
            ("src/app.py", 400),
            ("README.md", 100),
        ]));
        let estimate = preflight(host.clone()).estimate("octocat/demo").await.unwrap();

        assert_eq!(host.content_calls.load(Ordering::SeqCst), 0);
        assert_eq!(estimate.tiers.len(), 3);

        // 40 bytes -> 10 input tokens -> 2 output tokens.
        let tier1 = &estimate.tiers[0];
        assert_eq!(tier1.tier, PriorityTier::Security);
        assert_eq!(tier1.matched_files, 1);
        assert_eq!(tier1.estimated_tokens, 12);
        assert!(tier1.estimated_cost_usd > 0.0);
        assert!(estimate.total_estimated_cost() > 0.0);
    }

    #[tokio::test]
    async fn test_estimate_caps_matched_files() {
        let entries: Vec<(String, u64)> = (0..30).map(|i| (format!("f{}.env", i), 100)).collect();
        let entry_refs: Vec<(&str, u64)> =
            entries.iter().map(|(p, s)| (p.as_str(), *s)).collect();
        let host = Arc::new(ListingHost::new(&entry_refs));

        let estimate = preflight(host)
            .with_max_files(5)
            .estimate("octocat/demo")
            .await
            .unwrap();

        assert_eq!(estimate.tiers[0].matched_files, 5);
        // Only the capped files contribute tokens: 5 x 25.
        assert_eq!(estimate.tiers[0].estimated_tokens, 125 + 25);
    }

    #[tokio::test]
    async fn test_estimate_private_without_credential() {
        let mut host = ListingHost::new(&[(".env", 40)]);
        host.private = true;
        let err = preflight(Arc::new(host))
            .estimate("octocat/demo")
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::PrivateRepo { .. }));
    }
}
