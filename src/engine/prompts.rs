//! Tier Instruction Prompts
//!
//! One fixed rubric per priority tier. Each prompt closes with the same
//! JSON output contract so the end-of-stream parse sees a uniform shape.

use crate::constants::engine;
use crate::types::{FetchedFile, PriorityTier};

const OUTPUT_CONTRACT: &str = r#"Respond ONLY with a JSON object of this exact shape, no prose before or after:
{
  "issues": [
    {
      "severity": "CRITICAL" | "HIGH" | "MEDIUM" | "LOW",
      "category": "security" | "bug" | "performance" | "quality",
      "file": "path/to/file",
      "line": 123,
      "title": "short title (max 100 chars)",
      "description": "what is wrong and why it matters",
      "impact": "concrete consequence if left unfixed",
      "fix": "specific remediation",
      "codeExample": "corrected code snippet"
    }
  ],
  "summary": "one-paragraph overview of this tier"
}
Omit "line", "impact", "fix" or "codeExample" when you have nothing concrete. Report no issue twice."#;

const TIER1_PROMPT: &str = r#"You are a senior application security reviewer examining the security-critical files of a repository.

Hunt specifically for:
- Hardcoded secrets: API keys, tokens, passwords, private keys, connection strings
- Broken authentication or authorization: missing checks, insecure session handling, privilege escalation paths
- Injection: SQL, command, template, and path traversal
- Cryptographic misuse: weak algorithms, static IVs/salts, home-grown crypto
- Unsafe deserialization and unvalidated redirects
- Dangerous defaults in deployment files: exposed ports, privileged containers, permissive CORS

Severity guidance: exploitable secret exposure or auth bypass is CRITICAL; exploitable injection is CRITICAL or HIGH; weakened crypto or risky defaults are HIGH or MEDIUM. Use category "security" unless a finding is purely a correctness bug."#;

const TIER2_PROMPT: &str = r#"You are a principal engineer reviewing the core business logic of a repository.

Hunt specifically for:
- Logic errors: inverted conditions, off-by-one, wrong operator, unreachable branches
- Unhandled failure paths: ignored errors, missing rollback, partial writes
- Data integrity: race conditions, non-atomic read-modify-write, lost updates
- Resource handling: leaks, unbounded growth, missing timeouts
- Performance traps on hot paths: N+1 queries, quadratic scans over unbounded input

Severity guidance: data loss or corruption is CRITICAL; incorrect results or crashes on realistic input are HIGH; degraded performance or fragile error handling is MEDIUM or LOW. Prefer categories "bug" and "performance"; use "quality" only for structural problems with concrete consequences."#;

const TIER3_PROMPT: &str = r#"You are reviewing the supporting files of a repository: configuration, scripts, tests, and documentation.

Hunt specifically for:
- Configuration drift: settings that contradict the code or each other
- Scripts with destructive defaults or missing safety checks
- Tests that assert nothing or mask failures
- Documentation that misleads: wrong commands, stale examples, missing setup steps
- Dependency declarations pinning known-problematic versions

Severity guidance: a config or script that can damage data is HIGH; misleading operational docs are MEDIUM; cosmetic staleness is LOW. Prefer categories "quality" and "bug"."#;

/// The fixed instruction prompt for one tier.
pub fn system_prompt(tier: PriorityTier) -> String {
    let rubric = match tier {
        PriorityTier::Security => TIER1_PROMPT,
        PriorityTier::CoreLogic => TIER2_PROMPT,
        PriorityTier::Supporting => TIER3_PROMPT,
    };
    format!("{}\n\n{}", rubric, OUTPUT_CONTRACT)
}

/// Concatenate file contents with per-file path headers into the single
/// user message. Oversized files are truncated rather than dropped.
pub fn build_user_message(files: &[FetchedFile]) -> String {
    let mut message = String::new();
    for file in files {
        message.push_str("### File: ");
        message.push_str(&file.path);
        message.push_str("\n\n");

        if file.content.chars().count() > engine::MAX_FILE_CHARS {
            let truncated: String = file.content.chars().take(engine::MAX_FILE_CHARS).collect();
            message.push_str(&truncated);
            message.push_str("\n[... truncated ...]\n");
        } else {
            message.push_str(&file.content);
        }
        message.push_str("\n\n");
    }
    message
}
