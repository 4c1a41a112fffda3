//! Token parsers for CODEOWNERS rule lines.
//!
//! This module contains nom-based parsers for the pieces of a rule line:
//! the pattern token, the owner tokens, and comment detection.

use nom::{
    IResult, Parser,
    bytes::complete::take_while1,
    character::complete::{char, space0, space1},
    combinator::rest,
};

/// Characters that can appear in a pattern or owner token.
///
/// A rule line is split purely on whitespace; `#` only introduces a comment
/// at the start of a line, never mid-line.
fn is_token_char(c: char) -> bool {
    !c.is_whitespace()
}

/// Parses a complete comment line (optional whitespace + `#` + content).
pub fn parse_comment_line(input: &str) -> IResult<&str, &str> {
    (space0, char('#'), rest)
        .map(|(_, _, content)| content)
        .parse(input)
}

/// Checks if a line is blank (empty or only whitespace).
pub fn is_blank_line(input: &str) -> bool {
    input.trim().is_empty()
}

/// Result of tokenizing a rule line.
#[derive(Debug, Clone)]
pub struct RuleComponents<'a> {
    /// The pattern text.
    pub pattern: &'a str,
    /// The owner tokens, in line order.
    pub owners: Vec<&'a str>,
}

/// Tokenizes a rule line into a pattern and one or more owners.
///
/// Fails when the line holds fewer than two tokens; the caller reports that
/// as a warning rather than an error.
pub fn parse_rule_components(input: &str) -> IResult<&str, RuleComponents<'_>> {
    let (after_ws, _) = space0(input)?;
    let (after_pattern, pattern) = take_while1(is_token_char)(after_ws)?;
    let (after_sep, _) = space1(after_pattern)?;

    let mut owners = Vec::new();
    let mut current = after_sep;

    loop {
        let (after_ws, _) = space0(current)?;
        if after_ws.is_empty() {
            break;
        }
        let (after_owner, owner) = take_while1(is_token_char)(after_ws)?;
        owners.push(owner);
        current = after_owner;
    }

    if owners.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            current,
            nom::error::ErrorKind::Many1,
        )));
    }

    Ok((current, RuleComponents { pattern, owners }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_line_detected() {
        let (_, content) = parse_comment_line("# hello").unwrap();
        assert_eq!(content, " hello");
    }

    #[test]
    fn indented_comment_detected() {
        assert!(parse_comment_line("   # indented").is_ok());
    }

    #[test]
    fn rule_line_is_not_a_comment() {
        assert!(parse_comment_line("*.rs @owner").is_err());
    }

    #[test]
    fn blank_lines() {
        assert!(is_blank_line(""));
        assert!(is_blank_line("   \t"));
        assert!(!is_blank_line(" x "));
    }

    #[test]
    fn tokenize_simple_rule() {
        let (_, components) = parse_rule_components("*.rs @rustacean").unwrap();
        assert_eq!(components.pattern, "*.rs");
        assert_eq!(components.owners, vec!["@rustacean"]);
    }

    #[test]
    fn tokenize_multiple_owners() {
        let (_, components) =
            parse_rule_components("/src/ @dev @acme/core dev@example.com").unwrap();
        assert_eq!(components.pattern, "/src/");
        assert_eq!(components.owners, vec!["@dev", "@acme/core", "dev@example.com"]);
    }

    #[test]
    fn tokenize_with_leading_and_extra_whitespace() {
        let (_, components) = parse_rule_components("  *.md \t @docs  @writers ").unwrap();
        assert_eq!(components.pattern, "*.md");
        assert_eq!(components.owners, vec!["@docs", "@writers"]);
    }

    #[test]
    fn pattern_without_owners_fails() {
        assert!(parse_rule_components("*.rs").is_err());
        assert!(parse_rule_components("*.rs   ").is_err());
    }

    #[test]
    fn hash_mid_line_is_an_owner_token() {
        // Rule lines split purely on whitespace; `#` only starts a comment
        // at the beginning of a line.
        let (_, components) = parse_rule_components("*.js @a #note").unwrap();
        assert_eq!(components.owners, vec!["@a", "#note"]);
    }
}
