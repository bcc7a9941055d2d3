//! Literal Masker
//!
//! Replaces every quoted string literal with an indexed placeholder so that
//! structural repairs can pattern-match on the remaining text without ever
//! touching characters that came from inside a literal.
//!
//! Placeholders are `U+E000 <index> U+E001`. A stray `U+E000` outside a
//! literal is itself captured as a literal, so every `U+E000` in masked text
//! opens a placeholder and `unmask(mask(s)) == s` holds for every input.

/// Opens a placeholder token
pub const PLACEHOLDER_OPEN: char = '\u{E000}';
/// Closes a placeholder token
pub const PLACEHOLDER_CLOSE: char = '\u{E001}';
/// Regex fragment matching one placeholder token
pub const PLACEHOLDER_PATTERN: &str = r"\x{E000}\d+\x{E001}";

/// Masked text plus the literals it stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedText {
    /// Input with every literal replaced by a placeholder
    pub masked: String,
    /// Captured literals (including delimiting quotes), indexed by placeholder
    pub literals: Vec<String>,
}

impl MaskedText {
    /// Restore literals into a (possibly rewritten) masked string
    pub fn restore(&self, rewritten: &str) -> String {
        unmask(rewritten, &self.literals)
    }
}

/// Mask all quoted literals in `input`
///
/// Tracks `\"` and `\\` escapes inside literals. An unterminated literal at
/// end of input is still captured.
pub fn mask(input: &str) -> MaskedText {
    let mut masked = String::with_capacity(input.len());
    let mut literals = Vec::new();
    let mut current = String::new();
    let mut in_literal = false;
    let mut escaped = false;

    for ch in input.chars() {
        if in_literal {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_literal = false;
                push_placeholder(&mut masked, &mut literals, std::mem::take(&mut current));
            }
        } else if ch == '"' {
            in_literal = true;
            current.push(ch);
        } else if ch == PLACEHOLDER_OPEN {
            push_placeholder(&mut masked, &mut literals, ch.to_string());
        } else {
            masked.push(ch);
        }
    }

    if in_literal {
        push_placeholder(&mut masked, &mut literals, current);
    }

    MaskedText { masked, literals }
}

/// Replace every placeholder token with its stored literal
///
/// Tokens whose index is out of range are left as-is.
pub fn unmask(masked: &str, literals: &[String]) -> String {
    let mut out = String::with_capacity(masked.len() + literals.iter().map(String::len).sum::<usize>());
    let mut rest = masked;

    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + PLACEHOLDER_OPEN.len_utf8()..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();

        let literal = if digits > 0 && after[digits..].starts_with(PLACEHOLDER_CLOSE) {
            after[..digits]
                .parse::<usize>()
                .ok()
                .and_then(|index| literals.get(index))
        } else {
            None
        };

        match literal {
            Some(literal) => {
                out.push_str(literal);
                rest = &after[digits + PLACEHOLDER_CLOSE.len_utf8()..];
            }
            None => {
                out.push(PLACEHOLDER_OPEN);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn push_placeholder(masked: &mut String, literals: &mut Vec<String>, literal: String) {
    masked.push(PLACEHOLDER_OPEN);
    masked.push_str(&literals.len().to_string());
    masked.push(PLACEHOLDER_CLOSE);
    literals.push(literal);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(input: &str) {
        let masked = mask(input);
        assert_eq!(unmask(&masked.masked, &masked.literals), input, "round trip failed for {:?}", input);
    }

    #[test]
    fn test_masks_simple_literals() {
        let masked = mask(r#"{"a": "b}{c"}"#);
        assert_eq!(masked.literals, vec![r#""a""#.to_string(), r#""b}{c""#.to_string()]);
        assert!(!masked.masked.contains('"'));
        assert!(!masked.masked.contains("b}{c"));
        assert_eq!(masked.masked.matches('{').count(), 1);
    }

    #[test]
    fn test_escaped_quotes_stay_inside_literal() {
        let masked = mask(r#"["say \"hi\"", "back\\slash"]"#);
        assert_eq!(masked.literals.len(), 2);
        assert_eq!(masked.literals[0], r#""say \"hi\"""#);
        assert_eq!(masked.literals[1], r#""back\\slash""#);
    }

    #[test]
    fn test_unterminated_literal_is_captured() {
        let masked = mask(r#"{"open": "never closed"#);
        assert_eq!(masked.literals.last().map(String::as_str), Some(r#""never closed"#));
        round_trip(r#"{"open": "never closed"#);
        round_trip(r#"{"dangling escape\"#);
    }

    #[test]
    fn test_round_trip_lossless() {
        for input in [
            "",
            "plain text without quotes",
            r#"{"total":100,"map":{"01":{"cost":10}"02":{"cost":20}}}"#,
            r#"{"note": "costs $1,200 ], [ and }{ here"}"#,
            "unicode \"héllo wörld 🚧\" tail",
            "stray \u{E000}0\u{E001} tokens \u{E000}",
            "\"literal with \u{E000}7\u{E001} inside\"",
            "\u{E001}\u{E000}\u{E000}12",
        ] {
            round_trip(input);
        }
    }

    #[test]
    fn test_stray_placeholder_char_is_captured() {
        let masked = mask("a\u{E000}b");
        assert_eq!(masked.literals, vec!["\u{E000}".to_string()]);
        assert_eq!(masked.masked, "a\u{E000}0\u{E001}b");
    }

    #[test]
    fn test_unmask_leaves_unknown_tokens() {
        let text = "x\u{E000}9\u{E001}y";
        assert_eq!(unmask(text, &[]), text);
    }
}
