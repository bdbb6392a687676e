//! Event Protocol
//!
//! The typed events a run streams to its caller, serialized as
//! `{"type": ..., "data": ...}` JSON objects. Within one tier, `status` and
//! `file` events strictly precede `issue` events, which precede the tier's
//! `complete` event; tiers never interleave.

use serde::Serialize;

use crate::types::error::LensError;
use crate::types::finding::Finding;
use crate::types::run::{PriorityTier, TierEstimate};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum AnalysisEvent {
    Status(StatusPayload),
    File(FilePayload),
    Issue(Finding),
    Complete(TierCompletePayload),
    Error(ErrorPayload),
    /// Keepalive emitted while the run is paused; carries no data.
    Heartbeat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub message: String,
    pub files_scanned: usize,
    pub total_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}

impl StatusPayload {
    /// A status event carrying only a message, no file counts yet.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            files_scanned: 0,
            total_files: 0,
            current_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Scanning,
    Complete,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub path: String,
    pub priority: PriorityTier,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierCompletePayload {
    pub priority: PriorityTier,
    pub files_scanned: usize,
    pub issues_found: usize,
    pub tokens_used: u64,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_priority_estimate: Option<TierEstimate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    pub code: String,
    pub retryable: bool,
}

impl ErrorPayload {
    pub fn from_error(err: &LensError) -> Self {
        Self {
            message: err.to_string(),
            code: err.code().to_string(),
            retryable: err.retryable(),
        }
    }
}
