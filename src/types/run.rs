//! Run Aggregates
//!
//! Priority tiers, per-tier results, and the run-level summary handed to
//! the caller when a run terminates. Tiers execute strictly in increasing
//! order; a `TierResult` is immutable once its analysis stream completes.

use serde::{Deserialize, Serialize};

use crate::types::finding::Finding;
use crate::types::repo::RepoMetadata;

/// One of the three ordered priority buckets files are classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PriorityTier {
    /// Security-critical files (credentials, auth, payment paths).
    Security = 1,
    /// Core business logic.
    CoreLogic = 2,
    /// Supporting code, configuration, and documentation.
    Supporting = 3,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 3] = [Self::Security, Self::CoreLogic, Self::Supporting];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The tier that runs after this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Security => Some(Self::CoreLogic),
            Self::CoreLogic => Some(Self::Supporting),
            Self::Supporting => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Security => "security-critical",
            Self::CoreLogic => "core logic",
            Self::Supporting => "supporting",
        }
    }
}

impl TryFrom<u8> for PriorityTier {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Security),
            2 => Ok(Self::CoreLogic),
            3 => Ok(Self::Supporting),
            other => Err(format!("invalid priority tier: {} (valid: 1-3)", other)),
        }
    }
}

impl From<PriorityTier> for u8 {
    fn from(tier: PriorityTier) -> u8 {
        tier as u8
    }
}

impl std::fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Immutable record of one completed tier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierResult {
    pub tier: PriorityTier,
    pub files_scanned: usize,
    pub findings: Vec<Finding>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl TierResult {
    /// A tier that matched or fetched zero files and never reached the AI.
    pub fn empty(tier: PriorityTier) -> Self {
        Self {
            tier,
            files_scanned: 0,
            findings: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
        }
    }

    pub fn tokens_used(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Forward-looking estimate for an upcoming tier, attached to the previous
/// tier's `complete` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierEstimate {
    pub files: usize,
    pub estimated_tokens: u64,
    pub estimated_cost: f64,
}

/// Terminal aggregate of one run, handed to the caller for persistence
/// once the run completes (all tiers done, or stopped early).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub repository: RepoMetadata,
    pub tiers: Vec<TierResult>,
    pub skipped_tiers: Vec<PriorityTier>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_usd: f64,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn total_findings(&self) -> usize {
        self.tiers.iter().map(|t| t.findings.len()).sum()
    }
}
