//! Hosting Provider API
//!
//! Read-only GitHub REST v3 client behind the `HostingProvider` trait. The
//! trait is the seam tests and alternative hosts plug into; the gateway
//! only ever talks through it.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::constants::gateway;
use crate::types::{FileTreeEntry, LensError, RepoMetadata, RepoRef, Result};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("repolens/", env!("CARGO_PKG_VERSION"));

/// Minimal read contract against a repository hosting provider.
#[async_trait]
pub trait HostingProvider: Send + Sync {
    async fn get_metadata(&self, repo: &RepoRef) -> Result<RepoMetadata>;

    /// Full recursive blob listing for one branch. One network round trip.
    async fn get_tree(&self, repo: &RepoRef, branch: &str) -> Result<Vec<FileTreeEntry>>;

    /// Content of one file, decoded from the transport encoding to text.
    async fn get_file_content(&self, repo: &RepoRef, path: &str) -> Result<String>;

    /// Whether requests carry a credential (gates private repositories).
    fn has_credential(&self) -> bool;
}

/// GitHub REST v3 implementation.
pub struct GitHubProvider {
    api_base: String,
    token: Option<SecretString>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GitHubProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubProvider")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GitHubProvider {
    pub fn new(api_base: impl Into<String>, token: Option<SecretString>) -> Result<Self> {
        Self::with_timeout(api_base, token, gateway::REQUEST_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        api_base: impl Into<String>,
        token: Option<SecretString>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(LensError::Http)?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    pub fn with_defaults(token: Option<SecretString>) -> Result<Self> {
        Self::new(DEFAULT_API_BASE, token)
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        request
    }

    /// Map non-success GitHub statuses onto the distinct error kinds the
    /// orchestrator routes on.
    async fn check(&self, repo: &RepoRef, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            404 => LensError::RepoNotFound {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
            },
            // The tree endpoint answers 409 for repositories with no commits.
            409 => LensError::RepoEmpty {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
            },
            429 => LensError::HostRateLimited(body),
            403 if body.to_lowercase().contains("rate limit") => LensError::HostRateLimited(body),
            _ => LensError::AccessDenied(format!("{}: {}", status, body)),
        })
    }
}

#[async_trait]
impl HostingProvider for GitHubProvider {
    async fn get_metadata(&self, repo: &RepoRef) -> Result<RepoMetadata> {
        let url = format!("{}/repos/{}/{}", self.api_base, repo.owner, repo.name);
        debug!(%repo, "fetching repository metadata");

        let response = self.get(url).send().await?;
        let response = self.check(repo, response).await?;
        let body: RepoResponse = response.json().await?;

        Ok(RepoMetadata {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            full_name: body
                .full_name
                .unwrap_or_else(|| format!("{}/{}", repo.owner, repo.name)),
            description: body.description,
            stars: body.stargazers_count,
            language: body.language,
            updated_at: body.updated_at,
            default_branch: body.default_branch,
            private: body.private,
        })
    }

    async fn get_tree(&self, repo: &RepoRef, branch: &str) -> Result<Vec<FileTreeEntry>> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base, repo.owner, repo.name, branch
        );
        debug!(%repo, branch, "fetching repository tree");

        let response = self.get(url).send().await?;
        let response = self.check(repo, response).await?;
        let body: TreeResponse = response.json().await?;

        Ok(body
            .tree
            .into_iter()
            .filter(|node| node.node_type == "blob")
            .map(|node| FileTreeEntry {
                path: node.path,
                size: node.size.unwrap_or(0),
                sha: node.sha,
            })
            .collect())
    }

    async fn get_file_content(&self, repo: &RepoRef, path: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, repo.owner, repo.name, path
        );

        let response = self.get(url).send().await?;
        let response = self.check(repo, response).await?;
        let body: ContentResponse = response.json().await?;

        match body.encoding.as_str() {
            "base64" => {
                let packed: String = body
                    .content
                    .unwrap_or_default()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                let bytes = BASE64.decode(packed).map_err(|e| {
                    LensError::Internal(format!("invalid base64 content for {}: {}", path, e))
                })?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            // "none" is returned for blobs above the contents-API size cap.
            other => Err(LensError::Internal(format!(
                "unsupported content encoding '{}' for {}",
                other, path
            ))),
        }
    }

    fn has_credential(&self) -> bool {
        self.token.is_some()
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct RepoResponse {
    full_name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    language: Option<String>,
    updated_at: DateTime<Utc>,
    default_branch: String,
    #[serde(default)]
    private: bool,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeNode>,
}

#[derive(Debug, Deserialize)]
struct TreeNode {
    path: String,
    #[serde(rename = "type")]
    node_type: String,
    size: Option<u64>,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<String>,
    encoding: String,
}
