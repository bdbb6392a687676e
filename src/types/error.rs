//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! Every fatal failure of a run maps to exactly one `error` event on the
//! outbound stream; `code()` provides the stable wire identifier and
//! `retryable()` tells the caller whether retrying the same request can
//! succeed. Tolerated failures (individual file fetches, malformed model
//! JSON) never become errors here - they are logged and degrade gracefully.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LensError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Input Validation
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid repository URL: {0}")]
    InvalidRepoUrl(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    // -------------------------------------------------------------------------
    // Hosting Provider
    // -------------------------------------------------------------------------
    #[error("Repository {owner}/{name} not found")]
    RepoNotFound { owner: String, name: String },

    #[error("Repository {owner}/{name} is empty")]
    RepoEmpty { owner: String, name: String },

    #[error("Repository {owner}/{name} is private: sign in with a hosting credential to analyze it")]
    PrivateRepo { owner: String, name: String },

    #[error("Hosting provider rate limit exceeded: {0}")]
    HostRateLimited(String),

    #[error("Access denied by hosting provider: {0}")]
    AccessDenied(String),

    // -------------------------------------------------------------------------
    // AI Service
    // -------------------------------------------------------------------------
    #[error("AI service rejected the credential")]
    AiInvalidCredentials,

    #[error("AI service rate limit exceeded: {0}")]
    AiRateLimited(String),

    #[error("AI service error ({status}): {message}")]
    AiService { status: u16, message: String },

    // -------------------------------------------------------------------------
    // Run Lifecycle
    // -------------------------------------------------------------------------
    /// The caller went away; all further work stops silently.
    #[error("Run cancelled by the caller")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LensError {
    /// Stable machine-readable code carried on `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Http(_) => "network_error",
            Self::Config(_) => "config_error",
            Self::InvalidRepoUrl(_) => "invalid_repository_url",
            Self::MissingParameter(_) => "missing_parameter",
            Self::RepoNotFound { .. } => "repository_not_found",
            Self::RepoEmpty { .. } => "repository_empty",
            Self::PrivateRepo { .. } => "private_repo_requires_login",
            Self::HostRateLimited(_) => "host_rate_limited",
            Self::AccessDenied(_) => "access_denied",
            Self::AiInvalidCredentials => "ai_invalid_credentials",
            Self::AiRateLimited(_) => "ai_rate_limited",
            Self::AiService { .. } => "ai_service_error",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller can expect a later retry of the same request to
    /// succeed. Only rate limiting and transport hiccups qualify; auth and
    /// not-found conditions need different input.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::HostRateLimited(_) | Self::AiRateLimited(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, LensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_stable() {
        let err = LensError::PrivateRepo {
            owner: "octocat".to_string(),
            name: "private".to_string(),
        };
        assert_eq!(err.code(), "private_repo_requires_login");
        assert_eq!(LensError::AiInvalidCredentials.code(), "ai_invalid_credentials");
        assert_eq!(
            LensError::AiRateLimited("slow down".to_string()).code(),
            "ai_rate_limited"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LensError::HostRateLimited("403".to_string()).retryable());
        assert!(LensError::AiRateLimited("429".to_string()).retryable());
        assert!(!LensError::AiInvalidCredentials.retryable());
        assert!(
            !LensError::RepoNotFound {
                owner: "a".to_string(),
                name: "b".to_string()
            }
            .retryable()
        );
        assert!(
            !LensError::PrivateRepo {
                owner: "a".to_string(),
                name: "b".to_string()
            }
            .retryable()
        );
    }

    #[test]
    fn test_cancelled() {
        assert!(LensError::Cancelled.is_cancelled());
        assert!(!LensError::AiInvalidCredentials.is_cancelled());
    }
}
