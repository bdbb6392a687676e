//! File Classifier
//!
//! Maps a repository-relative path to a priority tier using four ordered
//! glob pattern tables. Resolution order is fixed: Ignore, then Tier 1,
//! Tier 2, Tier 3 - the first table containing a matching pattern wins, so
//! a file matching patterns in several tiers lands in the numerically
//! lowest one. Paths matching nothing are ignored rather than defaulted.
//!
//! Classification is a pure function of the path string; no file content
//! is consulted and no synchronization is needed for concurrent use.

mod patterns;

use glob::{MatchOptions, Pattern};
use tracing::warn;

use crate::types::error::{LensError, Result};
use crate::types::repo::FileTreeEntry;
use crate::types::run::PriorityTier;

/// Outcome of classifying a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Tier(PriorityTier),
    Ignored,
}

impl Classification {
    pub fn tier(self) -> Option<PriorityTier> {
        match self {
            Self::Tier(tier) => Some(tier),
            Self::Ignored => None,
        }
    }
}

struct CompiledPattern {
    pattern: Pattern,
    /// Bare patterns (no `/`) also match against the basename, so `*.md`
    /// catches `docs/readme.md`.
    match_base: bool,
}

pub struct Classifier {
    ignore: Vec<CompiledPattern>,
    tiers: [Vec<CompiledPattern>; 3],
    options: MatchOptions,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Classifier with the built-in pattern tables.
    pub fn new() -> Self {
        Self {
            ignore: compile_table(patterns::IGNORE_PATTERNS.iter().copied()),
            tiers: [
                compile_table(patterns::TIER1_PATTERNS.iter().copied()),
                compile_table(patterns::TIER2_PATTERNS.iter().copied()),
                compile_table(patterns::TIER3_PATTERNS.iter().copied()),
            ],
            options: match_options(),
        }
    }

    /// Classifier with caller-supplied tables; rejects invalid patterns.
    pub fn with_tables(
        ignore: &[&str],
        tier1: &[&str],
        tier2: &[&str],
        tier3: &[&str],
    ) -> Result<Self> {
        Ok(Self {
            ignore: compile_table_strict(ignore)?,
            tiers: [
                compile_table_strict(tier1)?,
                compile_table_strict(tier2)?,
                compile_table_strict(tier3)?,
            ],
            options: match_options(),
        })
    }

    /// Classify one repository-relative path.
    pub fn classify(&self, path: &str) -> Classification {
        let path = path.trim_start_matches("./").trim_start_matches('/');

        if self.matches_any(&self.ignore, path) {
            return Classification::Ignored;
        }
        for (index, table) in self.tiers.iter().enumerate() {
            if self.matches_any(table, path) {
                // Index 0..=2 maps onto tiers 1..=3.
                let tier = PriorityTier::ALL[index];
                return Classification::Tier(tier);
            }
        }
        Classification::Ignored
    }

    /// Tree entries belonging to one tier, in listing order.
    pub fn files_for_tier<'a>(
        &self,
        entries: &'a [FileTreeEntry],
        tier: PriorityTier,
    ) -> Vec<&'a FileTreeEntry> {
        entries
            .iter()
            .filter(|entry| self.classify(&entry.path) == Classification::Tier(tier))
            .collect()
    }

    fn matches_any(&self, table: &[CompiledPattern], path: &str) -> bool {
        let basename = path.rsplit('/').next().unwrap_or(path);
        table.iter().any(|cp| {
            cp.pattern.matches_with(path, self.options)
                || (cp.match_base
                    && basename != path
                    && cp.pattern.matches_with(basename, self.options))
        })
    }
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        // `*` must not cross a path separator; only `**` spans segments.
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn compile(raw: &str) -> Option<CompiledPattern> {
    match Pattern::new(raw) {
        Ok(pattern) => Some(CompiledPattern {
            pattern,
            match_base: !raw.contains('/'),
        }),
        Err(err) => {
            warn!(pattern = raw, %err, "skipping invalid classifier pattern");
            None
        }
    }
}

fn compile_table<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<CompiledPattern> {
    raw.filter_map(compile).collect()
}

fn compile_table_strict(raw: &[&str]) -> Result<Vec<CompiledPattern>> {
    raw.iter()
        .map(|p| {
            let pattern = Pattern::new(p)
                .map_err(|e| LensError::Config(format!("invalid pattern '{}': {}", p, e)))?;
            Ok(CompiledPattern {
                pattern,
                match_base: !p.contains('/'),
            })
        })
        .collect()
}
