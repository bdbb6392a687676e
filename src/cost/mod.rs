//! Token and Cost Estimation
//!
//! Pure arithmetic over text length and a fixed pricing model. The token
//! heuristic is deliberately approximate (4 characters per token, no real
//! tokenizer) so pre-flight estimates stay fast; post-hoc accounting uses
//! the usage numbers the AI service reports.

use serde::{Deserialize, Serialize};

use crate::constants::pricing;

/// Estimate input tokens for a text: ceil(chars / 4).
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Estimate tokens for a file known only by its byte size (listing data,
/// no content fetched).
pub fn estimate_tokens_from_size(size_bytes: u64) -> u64 {
    size_bytes.div_ceil(4)
}

/// Estimate output tokens from input tokens using the empirical ratio.
pub fn estimate_output_tokens(input_tokens: u64) -> u64 {
    (input_tokens as f64 * pricing::OUTPUT_RATIO).ceil() as u64
}

/// Linear pricing over per-megatoken rates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingModel {
    /// USD per million input tokens
    pub input_per_mtok: f64,
    /// USD per million output tokens
    pub output_per_mtok: f64,
}

impl Default for PricingModel {
    fn default() -> Self {
        Self {
            input_per_mtok: pricing::DEFAULT_INPUT_PER_MTOK,
            output_per_mtok: pricing::DEFAULT_OUTPUT_PER_MTOK,
        }
    }
}

impl PricingModel {
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1_000_000.0 * self.input_per_mtok
            + output_tokens as f64 / 1_000_000.0 * self.output_per_mtok
    }
}
