//! Sanitizing Orchestrator
//!
//! Tries increasingly aggressive repairs, short-circuiting on the first one
//! that parses:
//! 0. Trimmed input as-is (valid JSON is returned byte-identical)
//! 1. Strip trailing separators outside literals
//! 2. Trailing separators + structural repair on masked text
//! 3. Give up with a `ParseFailure` carrying a context window
//!
//! Every rewrite runs on masked text, so literal content is never altered.

use super::literal_masker::mask;
use super::structure_repairer::{strip_trailing_separators, SeparatorRepairer, StructureRepair};
use crate::error::ParseFailure;
use serde_json::Value;
use tracing::{debug, warn};

/// Characters of context kept on each side of a failure offset
pub const CONTEXT_RADIUS: usize = 100;

/// Which stage produced the valid text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    AlreadyValid,
    TrailingSeparators,
    StructuralRepair,
}

/// Valid JSON text and its parsed value
#[derive(Debug, Clone)]
pub struct Sanitized {
    pub text: String,
    pub value: Value,
    pub strategy: RepairStrategy,
}

/// Staged JSON repair
pub struct SanitizingOrchestrator {
    repairer: Box<dyn StructureRepair>,
}

impl SanitizingOrchestrator {
    pub fn new() -> Self {
        Self::with_repairer(Box::new(SeparatorRepairer::new()))
    }

    pub fn with_repairer(repairer: Box<dyn StructureRepair>) -> Self {
        Self { repairer }
    }

    /// Turn near-valid JSON into valid JSON
    pub fn sanitize(&self, candidate: &str) -> Result<Sanitized, ParseFailure> {
        let trimmed = candidate.trim();

        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return Ok(Sanitized {
                text: trimmed.to_string(),
                value,
                strategy: RepairStrategy::AlreadyValid,
            });
        }

        let masked = mask(trimmed);
        let stripped = strip_trailing_separators(&masked.masked);
        let attempt = masked.restore(&stripped);
        if let Ok(value) = serde_json::from_str::<Value>(&attempt) {
            debug!("JSON repaired by stripping trailing separators");
            return Ok(Sanitized {
                text: attempt,
                value,
                strategy: RepairStrategy::TrailingSeparators,
            });
        }

        let repaired = masked.restore(&self.repairer.repair(&stripped));
        match serde_json::from_str::<Value>(&repaired) {
            Ok(value) => {
                debug!(repairer = self.repairer.name(), "JSON repaired structurally");
                Ok(Sanitized {
                    text: repaired,
                    value,
                    strategy: RepairStrategy::StructuralRepair,
                })
            }
            Err(e) => {
                let failure = parse_failure(&repaired, &e);
                warn!(
                    offset = failure.offset,
                    error = %failure.message,
                    "JSON repair exhausted"
                );
                Err(failure)
            }
        }
    }
}

impl Default for SanitizingOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Sanitize with the default repairer, returning only the text
pub fn sanitize(candidate: &str) -> Result<String, ParseFailure> {
    SanitizingOrchestrator::new()
        .sanitize(candidate)
        .map(|sanitized| sanitized.text)
}

/// Extract the candidate object from raw generator output
///
/// Greedy: the first `{` through the last `}`. A `{` with no closing brace
/// after it yields the rest of the input so the failure is reported by the
/// sanitizer. Returns `None` when there is no `{` at all.
pub fn extract_candidate(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    match raw.rfind('}') {
        Some(end) if end > start => Some(&raw[start..=end]),
        _ => Some(&raw[start..]),
    }
}

/// Build a `ParseFailure` for `text` from a serde_json error
pub(crate) fn parse_failure(text: &str, error: &serde_json::Error) -> ParseFailure {
    let offset = byte_offset(text, error.line(), error.column());
    ParseFailure {
        offset,
        message: error.to_string(),
        context: context_window(text, offset, CONTEXT_RADIUS),
    }
}

/// Byte offset of a 1-based line/column position, clamped to the text
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();

    let mut offset = (line_start + column.saturating_sub(1)).min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Up to `radius` characters either side of `offset`
pub(crate) fn context_window(text: &str, offset: usize, radius: usize) -> String {
    let (before, after) = text.split_at(offset.min(text.len()));
    let start = before
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = after
        .char_indices()
        .nth(radius)
        .map(|(i, _)| i)
        .unwrap_or(after.len());

    format!("{}{}", &before[start..], &after[..end])
}
