//! Validate Command
//!
//! Resolves a repository URL to its metadata without starting a run.

use crate::classifier::Classifier;
use crate::cli::render::render_metadata;
use crate::cli::util::build_gateway;
use crate::config::Config;
use crate::orchestrator::Preflight;
use crate::types::Result;

pub struct ValidateOptions {
    pub url: String,
    pub github_token: Option<String>,
    pub json: bool,
}

pub async fn run(config: &Config, options: ValidateOptions) -> Result<()> {
    let gateway = build_gateway(config, options.github_token)?;
    let preflight = Preflight::new(gateway, Classifier::new(), config.pricing);

    let metadata = preflight.validate(&options.url).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    } else {
        render_metadata(&metadata);
    }
    Ok(())
}
