//! Lenient Findings Parse
//!
//! Models wrap JSON in markdown fences, leave trailing commas, truncate
//! mid-string when the output ceiling bites, or pad the object with prose.
//! This module treats the accumulated stream text as hostile input and
//! tries progressively harder to recover a `{issues, summary}` object.
//! Unrecoverable text yields zero findings, never an error: a tier with a
//! garbled response still completes.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::Finding;

/// Decoded result of one tier's accumulated stream text.
#[derive(Debug, Default)]
pub struct ParsedAnalysis {
    pub findings: Vec<Finding>,
    pub summary: Option<String>,
}

/// Parse the accumulated completion text into findings.
///
/// Finding ids are synthesized as timestamp + index: the model does not
/// reliably produce unique ids.
pub fn parse_analysis(raw: &str) -> ParsedAnalysis {
    let Some(value) = parse_lenient(raw) else {
        warn!(
            preview = &raw.chars().take(120).collect::<String>(),
            "analysis output is not recoverable JSON, reporting zero findings"
        );
        return ParsedAnalysis::default();
    };

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string);

    let Some(issues) = value.get("issues").and_then(Value::as_array) else {
        warn!("analysis output has no issues array, reporting zero findings");
        return ParsedAnalysis { findings: Vec::new(), summary };
    };

    let stamp = Utc::now().timestamp_millis();
    let findings = issues
        .iter()
        .enumerate()
        .filter_map(|(index, item)| Finding::from_model_value(item, format!("{}-{}", stamp, index)))
        .collect();

    ParsedAnalysis { findings, summary }
}

/// Try progressively harder to turn raw text into a JSON value.
fn parse_lenient(raw: &str) -> Option<Value> {
    let cleaned = strip_code_fences(raw.trim().trim_start_matches('\u{feff}'));
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }
    debug!("direct JSON parse failed, attempting repair");

    let repaired = balance_brackets(&fix_trailing_commas(cleaned));
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        warn!("analysis JSON required repair");
        return Some(value);
    }

    // Last resort: cut the outermost object out of surrounding prose.
    let extracted = extract_object(cleaned)?;
    let repaired = balance_brackets(&fix_trailing_commas(extracted));
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        warn!("analysis JSON extracted from mixed content");
        return Some(value);
    }

    None
}

/// Remove a surrounding markdown code fence (```json ... ``` or ``` ... ```).
fn strip_code_fences(s: &str) -> &str {
    let mut result = s;
    if result.starts_with("```")
        && let Some(newline) = result.find('\n')
    {
        result = &result[newline + 1..];
    }
    if let Some(stripped) = result.trim_end().strip_suffix("```") {
        result = stripped;
    }
    result
}

/// Drop commas that directly precede a closing bracket. String-aware.
fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            result.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                result.push(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    continue;
                }
                result.push(ch);
            }
            _ => result.push(ch),
        }
    }
    result
}

/// Close an unterminated string and append missing closing brackets, so a
/// truncated document at least parses structurally.
fn balance_brackets(s: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in s.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut result = s.trim_end().to_string();
    if in_string {
        result.push('"');
    }
    // A truncation point right after a comma or colon needs the dangling
    // token removed before closing up.
    while result.ends_with(',') || result.ends_with(':') {
        result.pop();
    }
    while let Some(closer) = stack.pop() {
        result.push(closer);
    }
    result
}

/// The span from the first `{` to the last `}`, if any; with no closing
/// brace the tail from the first `{` (a truncated document).
fn extract_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    match s.rfind('}') {
        Some(end) if end > start => Some(&s[start..=end]),
        _ => Some(&s[start..]),
    }
}
