//! Findings
//!
//! One finding is a single AI-reported observation about a file. Findings
//! are produced exclusively by the analysis engine's end-of-stream parse
//! and never mutated afterwards.
//!
//! The model's output is treated as untyped: every field is decoded
//! independently with an explicit default, because real responses routinely
//! omit or misspell fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Titles longer than this are truncated during decode.
pub const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Decode a model-produced severity string; anything unrecognized
    /// becomes `Medium`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "CRITICAL" => Self::Critical,
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            "LOW" => Self::Low,
            _ => Self::Medium,
        }
    }

    /// Ordering rank, 0 = most severe.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Security,
    Bug,
    Performance,
    Quality,
}

impl IssueCategory {
    /// Decode a model-produced category string; anything unrecognized
    /// becomes `Quality`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "security" => Self::Security,
            "bug" => Self::Bug,
            "performance" => Self::Performance,
            "quality" => Self::Quality,
            _ => Self::Quality,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Bug => "bug",
            Self::Performance => "performance",
            Self::Quality => "quality",
        }
    }
}

/// One AI-reported issue, unique per run via its synthesized id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub severity: Severity,
    pub category: IssueCategory,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
}

impl Finding {
    /// Lenient decode of one model-produced issue object.
    ///
    /// The model does not reliably produce unique ids, so `id` is always
    /// supplied by the caller. Non-object values are dropped; everything
    /// else decodes with per-field defaults.
    pub fn from_model_value(value: &Value, id: String) -> Option<Self> {
        let obj = value.as_object()?;

        let str_field = |key: &str| -> Option<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let severity = obj
            .get("severity")
            .and_then(Value::as_str)
            .map(Severity::parse_lenient)
            .unwrap_or(Severity::Medium);
        let category = obj
            .get("category")
            .and_then(Value::as_str)
            .map(IssueCategory::parse_lenient)
            .unwrap_or(IssueCategory::Quality);

        let file = str_field("file").unwrap_or_else(|| "unknown".to_string());
        let line = obj
            .get("line")
            .and_then(Value::as_u64)
            .filter(|n| *n > 0 && *n <= u32::MAX as u64)
            .map(|n| n as u32);

        let title = truncate_chars(
            &str_field("title").unwrap_or_else(|| "Untitled finding".to_string()),
            MAX_TITLE_CHARS,
        );
        let description = str_field("description").unwrap_or_default();

        Some(Self {
            id,
            severity,
            category,
            file,
            line,
            title,
            description,
            impact: str_field("impact"),
            fix: str_field("fix"),
            code_example: str_field("codeExample").or_else(|| str_field("code_example")),
        })
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
