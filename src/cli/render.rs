//! Console Rendering
//!
//! Human-readable presentation of events, metadata, and summaries. The
//! NDJSON mode bypasses all of this and serializes events directly.

use console::style;

use crate::types::{
    AnalysisEvent, FileStatus, Finding, RepoMetadata, RunSummary, Severity,
};

fn severity_label(severity: Severity) -> String {
    let label = severity.label();
    match severity {
        Severity::Critical => style(label).red().bold().to_string(),
        Severity::High => style(label).red().to_string(),
        Severity::Medium => style(label).yellow().to_string(),
        Severity::Low => style(label).dim().to_string(),
    }
}

pub fn render_event(event: &AnalysisEvent) {
    match event {
        AnalysisEvent::Status(status) => {
            if status.total_files > 0 {
                println!(
                    "{}",
                    style(format!(
                        "  {} [{}/{}]",
                        status.message, status.files_scanned, status.total_files
                    ))
                    .dim()
                );
            } else {
                println!("{}", style(format!("  {}", status.message)).dim());
            }
        }
        AnalysisEvent::File(file) => match file.status {
            // The fetch-progress status line already names the file.
            FileStatus::Scanning => {}
            FileStatus::Complete => println!("  {} {}", style("✓").green(), file.path),
        },
        AnalysisEvent::Issue(finding) => render_finding(finding),
        AnalysisEvent::Complete(payload) => {
            println!();
            println!(
                "{}",
                style(format!(
                    "Priority {} complete: {} files, {} issues, {} tokens, ${:.4}",
                    payload.priority,
                    payload.files_scanned,
                    payload.issues_found,
                    payload.tokens_used,
                    payload.cost
                ))
                .bold()
            );
            if let Some(estimate) = &payload.next_priority_estimate {
                println!(
                    "  Next tier: {} files, ~{} tokens, ~${:.4}",
                    estimate.files, estimate.estimated_tokens, estimate.estimated_cost
                );
            }
        }
        AnalysisEvent::Error(error) => {
            eprintln!("{} {} ({})", style("✗").red(), error.message, error.code);
        }
        AnalysisEvent::Heartbeat => {}
    }
}

pub fn render_finding(finding: &Finding) {
    let location = match finding.line {
        Some(line) => format!("{}:{}", finding.file, line),
        None => finding.file.clone(),
    };
    println!(
        "  {} [{}] {} ({})",
        severity_label(finding.severity),
        finding.category.label(),
        style(&finding.title).bold(),
        style(location).dim()
    );
    if !finding.description.is_empty() {
        println!("      {}", finding.description);
    }
    if let Some(fix) = &finding.fix {
        println!("      {} {}", style("fix:").green(), fix);
    }
}

pub fn render_metadata(metadata: &RepoMetadata) {
    println!("{}", style(&metadata.full_name).bold());
    if let Some(description) = &metadata.description {
        println!("  {}", description);
    }
    println!(
        "  ★ {}  language: {}  default branch: {}{}",
        metadata.stars,
        metadata.language.as_deref().unwrap_or("unknown"),
        metadata.default_branch,
        if metadata.private { "  (private)" } else { "" }
    );
}

pub fn render_summary(summary: &RunSummary) {
    println!();
    println!("{}", style("Analysis summary").bold().underlined());
    for tier in &summary.tiers {
        println!(
            "  Priority {} ({}): {} files, {} findings, ${:.4}",
            tier.tier,
            tier.tier.label(),
            tier.files_scanned,
            tier.findings.len(),
            tier.cost_usd
        );
    }
    for tier in &summary.skipped_tiers {
        println!(
            "  Priority {} ({}): {}",
            tier,
            tier.label(),
            style("skipped").dim()
        );
    }

    let mut counts = [0usize; 4];
    for tier in &summary.tiers {
        for finding in &tier.findings {
            counts[finding.severity.rank() as usize] += 1;
        }
    }
    println!(
        "  Findings: {} critical, {} high, {} medium, {} low",
        counts[0], counts[1], counts[2], counts[3]
    );
    println!(
        "  Tokens: {} in / {} out  Cost: ${:.4}  Duration: {:.1}s",
        summary.total_input_tokens,
        summary.total_output_tokens,
        summary.total_cost_usd,
        summary.duration_ms as f64 / 1000.0
    );
}
