//! Structural Repairer
//!
//! Heuristic separator insertion on masked text. The generator's most common
//! failure is a missing comma between sibling entries, not broken nesting,
//! so the rules are deliberately broad rather than grammar-aware:
//!
//! 1. `}` then `{`, a literal, a digit or `-` → `},`
//! 2. `]` then `[`, a literal, a digit or `-` → `],`
//! 3. a literal, whitespace, then another literal → comma between them
//!    (`"a": "x" "b": "y"`)
//!
//! None of these adjacencies can occur in valid JSON outside string
//! literals, so valid input passes through unchanged.
//!
//! Input MUST already be masked (see `literal_masker`); on unmasked text
//! the rules would rewrite literal content.

use super::literal_masker::PLACEHOLDER_PATTERN;
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

/// Structural repair strategy over masked text
///
/// Kept behind a trait so the regex heuristics can be swapped for a
/// tolerant parser without changing the orchestrator.
pub trait StructureRepair: Send + Sync {
    /// Strategy name for diagnostics
    fn name(&self) -> &'static str;

    /// Rewrite masked text, returning masked text
    fn repair(&self, masked: &str) -> String;
}

/// Regex-based missing-separator repair
#[derive(Debug, Default, Clone, Copy)]
pub struct SeparatorRepairer;

impl SeparatorRepairer {
    pub fn new() -> Self {
        Self
    }
}

impl StructureRepair for SeparatorRepairer {
    fn name(&self) -> &'static str {
        "SeparatorRepairer"
    }

    fn repair(&self, masked: &str) -> String {
        let step1 = object_gap_re().replace_all(masked, "},${gap}${next}");
        let step2 = array_gap_re().replace_all(&step1, "],${gap}${next}");
        // Matches cannot overlap, so a run of literals needs a second pass
        let step3 = literal_gap_re().replace_all(&step2, "${prev},${gap}${next}");
        let step3 = literal_gap_re().replace_all(&step3, "${prev},${gap}${next}");

        trace!(
            before = masked.len(),
            after = step3.len(),
            "Separator repair applied"
        );

        step3.into_owned()
    }
}

/// Remove a `,` directly (modulo whitespace) before `}` or `]`
///
/// Operates on masked text like the repairer.
pub fn strip_trailing_separators(masked: &str) -> String {
    trailing_separator_re()
        .replace_all(masked, "${gap}${close}")
        .into_owned()
}

fn object_gap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\}}(?P<gap>\s*)(?P<next>\{{|{}|\d|-)", PLACEHOLDER_PATTERN))
            .expect("object gap regex must compile")
    })
}

fn array_gap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\](?P<gap>\s*)(?P<next>\[|{}|\d|-)", PLACEHOLDER_PATTERN))
            .expect("array gap regex must compile")
    })
}

fn literal_gap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?P<prev>{p})(?P<gap>\s+)(?P<next>{p})",
            p = PLACEHOLDER_PATTERN
        ))
        .expect("literal gap regex must compile")
    })
}

fn trailing_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r",(?P<gap>\s*)(?P<close>[}\]])").expect("trailing separator regex must compile")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::literal_masker::mask;

    fn repair_raw(input: &str) -> String {
        let masked = mask(input);
        masked.restore(&SeparatorRepairer::new().repair(&masked.masked))
    }

    #[test]
    fn test_inserts_comma_between_objects() {
        assert_eq!(repair_raw(r#"[{"a":1}{"b":2}]"#), r#"[{"a":1},{"b":2}]"#);
        assert_eq!(repair_raw("[{\"a\":1}\n  {\"b\":2}]"), "[{\"a\":1},\n  {\"b\":2}]");
    }

    #[test]
    fn test_inserts_comma_before_key_after_object() {
        assert_eq!(
            repair_raw(r#"{"01":{"cost":10}"02":{"cost":20}}"#),
            r#"{"01":{"cost":10},"02":{"cost":20}}"#
        );
    }

    #[test]
    fn test_inserts_comma_after_arrays() {
        assert_eq!(repair_raw("[[1,2][3]]"), "[[1,2],[3]]");
        assert_eq!(repair_raw(r#"{"a":[1] "b":2}"#), r#"{"a":[1], "b":2}"#);
        assert_eq!(repair_raw("[[1] -2]"), "[[1], -2]");
    }

    #[test]
    fn test_inserts_comma_between_adjacent_literals() {
        assert_eq!(repair_raw(r#"{"a": "x" "b": "y"}"#), r#"{"a": "x", "b": "y"}"#);
        assert_eq!(repair_raw(r#"["x" "y" "z" "w"]"#), r#"["x", "y", "z", "w"]"#);
    }

    #[test]
    fn test_valid_json_unchanged() {
        let valid = r#"{"a": [1, {"b": "}{"}], "c": {"d": null}, "e": "x y"}"#;
        assert_eq!(repair_raw(valid), valid);
    }

    #[test]
    fn test_literal_content_untouched() {
        let input = r#"{"note": "}{ and ],[ stay"}"#;
        assert_eq!(repair_raw(input), input);
    }

    #[test]
    fn test_strip_trailing_separators() {
        let masked = mask(r#"{"a": [1, 2, ], "b": ",}",}"#);
        let stripped = masked.restore(&strip_trailing_separators(&masked.masked));
        assert_eq!(stripped, r#"{"a": [1, 2 ], "b": ",}"}"#);
    }
}
