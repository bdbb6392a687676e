//! Repository Domain Types
//!
//! Identifiers and read-only snapshots of a remote repository: the parsed
//! owner/name reference, metadata fetched once per run, and the flat file
//! tree the classifier and gateway operate on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::error::{LensError, Result};

/// Owner/name pair identifying one repository. Constructed once per run by
/// parsing the caller-supplied URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse a repository reference from a GitHub URL or `owner/name`
    /// shorthand. A trailing `.git` and any path segments beyond the
    /// repository name are ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(LensError::InvalidRepoUrl("empty URL".to_string()));
        }

        let path = if input.contains("://") {
            let url = Url::parse(input)
                .map_err(|e| LensError::InvalidRepoUrl(format!("{}: {}", input, e)))?;
            match url.host_str() {
                Some(host) if host == "github.com" || host == "www.github.com" => {}
                Some(host) => {
                    return Err(LensError::InvalidRepoUrl(format!(
                        "unsupported host '{}'",
                        host
                    )));
                }
                None => {
                    return Err(LensError::InvalidRepoUrl(format!("{}: missing host", input)));
                }
            }
            url.path().trim_matches('/').to_string()
        } else {
            input.trim_matches('/').to_string()
        };

        let mut segments = path.split('/');
        let owner = segments.next().unwrap_or_default();
        let name = segments
            .next()
            .unwrap_or_default()
            .trim_end_matches(".git");

        if owner.is_empty() || name.is_empty() {
            return Err(LensError::InvalidRepoUrl(format!(
                "{}: expected owner/name",
                input
            )));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository metadata, fetched once per run and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMetadata {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub stars: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub default_branch: String,
    pub private: bool,
}

/// One blob in the repository tree at the default branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTreeEntry {
    pub path: String,
    pub size: u64,
    pub sha: String,
}

/// A file whose content was fetched and decoded to text.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub path: String,
    pub content: String,
    pub size: usize,
}
