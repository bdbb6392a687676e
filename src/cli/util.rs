//! Shared command plumbing.

use secrecy::SecretString;
use std::sync::Arc;

use crate::config::Config;
use crate::gateway::{ContentGateway, GitHubProvider};
use crate::types::Result;

/// Build the gateway for one command. Token resolution order: command
/// line (or its env fallback), then the config file.
pub fn build_gateway(config: &Config, token_override: Option<String>) -> Result<Arc<ContentGateway>> {
    let token = token_override
        .or_else(|| config.github.token.clone())
        .map(SecretString::from);
    let provider =
        GitHubProvider::with_timeout(config.github.api_base.as_str(), token, config.github.timeout_secs)?;
    Ok(Arc::new(ContentGateway::new(Arc::new(provider))))
}
