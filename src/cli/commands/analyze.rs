//! Analyze Command
//!
//! Drives one full tiered run: renders the event stream (or emits raw
//! NDJSON), prompts for approval between tiers, and prints the terminal
//! summary.

use secrecy::SecretString;
use std::sync::Arc;

use crate::classifier::Classifier;
use crate::cli::render::{render_event, render_summary};
use crate::cli::util::build_gateway;
use crate::config::Config;
use crate::engine::{AnalysisEngine, AnthropicBackend};
use crate::orchestrator::{AnalysisSession, Orchestrator, StartRequest};
use crate::types::{AnalysisEvent, LensError, PriorityTier, Result};

pub struct AnalyzeOptions {
    pub url: String,
    pub api_key: Option<String>,
    pub github_token: Option<String>,
    pub starting_tier: PriorityTier,
    /// Approve every tier without prompting.
    pub yes: bool,
    /// Emit raw NDJSON events on stdout instead of rendered output.
    pub json: bool,
}

pub async fn run(config: &Config, options: AnalyzeOptions) -> Result<()> {
    let api_key = options.api_key.ok_or(LensError::MissingParameter(
        "AI credential (--api-key or ANTHROPIC_API_KEY)",
    ))?;

    let gateway = build_gateway(config, options.github_token)?;
    let backend = AnthropicBackend::new(
        config.ai.api_base.as_str(),
        config.ai.model.as_str(),
        config.ai.timeout_secs,
    )?;
    let engine = AnalysisEngine::new(Arc::new(backend), config.pricing)
        .with_sampling(config.ai.temperature, config.ai.max_output_tokens);
    let orchestrator = Arc::new(
        Orchestrator::new(gateway, engine, Classifier::new(), config.pricing)
            .with_max_files(config.analysis.max_files_per_tier),
    );

    let mut session = AnalysisSession::start(
        orchestrator,
        StartRequest {
            repository_url: options.url,
            ai_credential: SecretString::from(api_key),
            starting_tier: options.starting_tier,
        },
    );

    while let Some(event) = session.next_event().await {
        if options.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            render_event(&event);
        }

        if let AnalysisEvent::Complete(payload) = &event {
            let completed = payload.priority;
            if let Some(next) = completed.next() {
                if options.yes || confirm_next(next)? {
                    session.approve(completed).await;
                } else {
                    session.stop(completed).await;
                }
            }
        }
    }

    let summary = session.join().await?;
    if options.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        render_summary(&summary);
    }
    Ok(())
}

/// Ask on stderr whether to open the next tier, so NDJSON on stdout stays
/// machine-readable.
fn confirm_next(next: PriorityTier) -> Result<bool> {
    let term = console::Term::stderr();
    term.write_str(&format!(
        "Continue to priority {} ({})? [y/N] ",
        next,
        next.label()
    ))?;
    let line = term.read_line()?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
