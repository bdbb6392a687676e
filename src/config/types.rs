//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/repolens/) and project (.repolens/) level
//! configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{engine, gateway, tiers};
use crate::cost::PricingModel;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Hosting-provider settings
    pub github: GithubConfig,

    /// AI completion service settings
    pub ai: AiConfig,

    /// Analysis run settings
    pub analysis: AnalysisConfig,

    /// Pricing model used for estimates and accounting
    pub pricing: PricingModel,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `LensError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=1.0).contains(&self.ai.temperature) {
            return Err(crate::types::LensError::Config(format!(
                "ai.temperature must be between 0.0 and 1.0, got {}",
                self.ai.temperature
            )));
        }

        if self.ai.timeout_secs == 0 {
            return Err(crate::types::LensError::Config(
                "ai.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.ai.max_output_tokens == 0 {
            return Err(crate::types::LensError::Config(
                "ai.max_output_tokens must be greater than 0".to_string(),
            ));
        }

        if self.github.timeout_secs == 0 {
            return Err(crate::types::LensError::Config(
                "github.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.analysis.max_files_per_tier == 0 {
            return Err(crate::types::LensError::Config(
                "analysis.max_files_per_tier must be greater than 0".to_string(),
            ));
        }

        if self.pricing.input_per_mtok < 0.0 || self.pricing.output_per_mtok < 0.0 {
            return Err(crate::types::LensError::Config(
                "pricing rates must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// GitHub Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// API base URL
    pub api_base: String,

    /// Personal access token for private repositories and higher rate
    /// limits. Usually supplied via GITHUB_TOKEN instead of the file.
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: crate::gateway::DEFAULT_API_BASE.to_string(),
            token: None,
            timeout_secs: gateway::REQUEST_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// AI Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API base URL
    pub api_base: String,

    /// Model name
    pub model: String,

    /// Sampling temperature (kept low so repeated runs agree)
    pub temperature: f32,

    /// Output-token ceiling per tier analysis
    pub max_output_tokens: u32,

    /// Request timeout for one streaming completion in seconds
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_base: crate::engine::DEFAULT_API_BASE.to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            temperature: engine::TEMPERATURE,
            max_output_tokens: engine::MAX_OUTPUT_TOKENS,
            timeout_secs: engine::REQUEST_TIMEOUT_SECS,
        }
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum files fetched and analyzed per priority tier
    pub max_files_per_tier: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_files_per_tier: tiers::DEFAULT_MAX_FILES_PER_TIER,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
