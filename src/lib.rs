//! repolens - Priority-Tiered AI Repository Analysis
//!
//! Analyzes a remote GitHub repository in three ordered priority tiers
//! (security-critical, core logic, supporting code), streaming
//! AI-generated findings to the caller as typed events with a human
//! approval gate between tiers.
//!
//! ## Core Flow
//!
//! ```text
//! URL → validate → classify tree → fetch tier files → stream AI analysis
//!        → issue events → tier complete → await approval → next tier
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use repolens::{
//!     AnalysisEngine, AnalysisSession, AnthropicBackend, Classifier, ContentGateway,
//!     GitHubProvider, Orchestrator, PricingModel, StartRequest,
//! };
//! use repolens::types::PriorityTier;
//!
//! let provider = Arc::new(GitHubProvider::with_defaults(None)?);
//! let backend = Arc::new(AnthropicBackend::with_defaults("claude-sonnet-4-20250514")?);
//! let orchestrator = Arc::new(Orchestrator::new(
//!     Arc::new(ContentGateway::new(provider)),
//!     AnalysisEngine::new(backend, PricingModel::default()),
//!     Classifier::new(),
//!     PricingModel::default(),
//! ));
//!
//! let mut session = AnalysisSession::start(orchestrator, StartRequest {
//!     repository_url: "rust-lang/cargo".to_string(),
//!     ai_credential: "sk-...".into(),
//!     starting_tier: PriorityTier::Security,
//! });
//! while let Some(event) = session.next_event().await {
//!     // render or forward the event; approve/stop after each tier
//! }
//! let summary = session.join().await?;
//! ```
//!
//! ## Modules
//!
//! - [`classifier`]: path to priority-tier pattern matching
//! - [`gateway`]: TTL-cached tree listing and batched content fetching
//! - [`cost`]: token and cost estimation heuristics
//! - [`engine`]: streaming AI analysis with lenient findings parse
//! - [`orchestrator`]: the tier state machine, session handle, pre-flight

pub mod classifier;
pub mod cli;
pub mod config;
pub mod constants;
pub mod cost;
pub mod engine;
pub mod gateway;
pub mod orchestrator;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::{LensError, Result};

// =============================================================================
// Component Re-exports
// =============================================================================

pub use classifier::{Classification, Classifier};

pub use cost::{PricingModel, estimate_output_tokens, estimate_tokens};

pub use engine::{AnalysisEngine, AnthropicBackend, CompletionBackend};

pub use gateway::{ContentGateway, GitHubProvider, HostingProvider, TreeCache};

pub use orchestrator::{
    AnalysisSession, ApprovalDecision, ApprovalSignal, Orchestrator, Preflight, RepoEstimate,
    StartRequest, TierPreflight,
};
