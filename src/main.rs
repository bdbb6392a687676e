use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repolens::cli::commands::{analyze, config as config_cmd, estimate, validate};
use repolens::config::ConfigLoader;
use repolens::types::PriorityTier;

/// Parse a priority tier from its numeric form
fn parse_tier(s: &str) -> Result<PriorityTier, String> {
    let value: u8 = s
        .parse()
        .map_err(|_| format!("invalid tier '{}' (valid: 1-3)", s))?;
    PriorityTier::try_from(value)
}

#[derive(Parser)]
#[command(name = "repolens")]
#[command(
    version,
    about = "Priority-tiered AI code analysis for remote repositories"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tiered analysis of a repository
    Analyze {
        #[arg(help = "Repository URL or owner/name shorthand")]
        url: String,
        #[arg(
            long,
            env = "ANTHROPIC_API_KEY",
            hide_env_values = true,
            help = "AI service credential"
        )]
        api_key: Option<String>,
        #[arg(
            long,
            env = "GITHUB_TOKEN",
            hide_env_values = true,
            help = "GitHub token for private repositories and higher rate limits"
        )]
        github_token: Option<String>,
        #[arg(long, value_parser = parse_tier, default_value = "1", help = "Tier to start from (1-3)")]
        starting_tier: PriorityTier,
        #[arg(long, short, help = "Approve every tier without prompting")]
        yes: bool,
        #[arg(long, help = "Emit raw NDJSON events on stdout")]
        json: bool,
    },

    /// Estimate per-tier analysis cost without running it
    Estimate {
        #[arg(help = "Repository URL or owner/name shorthand")]
        url: String,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },

    /// Resolve a repository URL to its metadata
    Validate {
        #[arg(help = "Repository URL or owner/name shorthand")]
        url: String,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", console::style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // stdout carries rendered output or the NDJSON event stream;
    // diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            url,
            api_key,
            github_token,
            starting_tier,
            yes,
            json,
        } => {
            let config = ConfigLoader::load()?;
            let rt = Runtime::new()?;
            rt.block_on(analyze::run(
                &config,
                analyze::AnalyzeOptions {
                    url,
                    api_key,
                    github_token,
                    starting_tier,
                    yes,
                    json,
                },
            ))?;
        }
        Commands::Estimate {
            url,
            github_token,
            json,
        } => {
            let config = ConfigLoader::load()?;
            let rt = Runtime::new()?;
            rt.block_on(estimate::run(
                &config,
                estimate::EstimateOptions {
                    url,
                    github_token,
                    json,
                },
            ))?;
        }
        Commands::Validate {
            url,
            github_token,
            json,
        } => {
            let config = ConfigLoader::load()?;
            let rt = Runtime::new()?;
            rt.block_on(validate::run(
                &config,
                validate::ValidateOptions {
                    url,
                    github_token,
                    json,
                },
            ))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                config_cmd::show(json)?;
            }
            ConfigAction::Path => {
                config_cmd::path();
            }
        },
    }

    Ok(())
}
