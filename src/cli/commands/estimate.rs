//! Estimate Command
//!
//! Listing-only cost preview for each of the three tiers.

use console::style;

use crate::classifier::Classifier;
use crate::cli::render::render_metadata;
use crate::cli::util::build_gateway;
use crate::config::Config;
use crate::orchestrator::Preflight;
use crate::types::Result;

pub struct EstimateOptions {
    pub url: String,
    pub github_token: Option<String>,
    pub json: bool,
}

pub async fn run(config: &Config, options: EstimateOptions) -> Result<()> {
    let gateway = build_gateway(config, options.github_token)?;
    let preflight = Preflight::new(gateway, Classifier::new(), config.pricing)
        .with_max_files(config.analysis.max_files_per_tier);

    let estimate = preflight.estimate(&options.url).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
        return Ok(());
    }

    render_metadata(&estimate.metadata);
    println!();
    println!("{}", style("Estimated analysis cost").bold());
    for tier in &estimate.tiers {
        println!(
            "  Priority {} ({}): {} files, ~{} tokens, ~${:.4}",
            tier.tier,
            tier.tier.label(),
            tier.matched_files,
            tier.estimated_tokens,
            tier.estimated_cost_usd
        );
    }
    println!(
        "  Total: ~${:.4}",
        estimate.total_estimated_cost()
    );
    Ok(())
}
