//! Line and file-level parsing for CODEOWNERS rule files.
//!
//! Parsing is always lenient: blank lines and comments are skipped, rule
//! lines become [`OwnershipRule`]s in file order, and anything malformed is
//! skipped with a warning so the remaining rules still apply.

use log::{debug, warn};

use super::lexer::{is_blank_line, parse_comment_line, parse_rule_components};
use super::warning::ParseWarning;
use crate::matching::Pattern;
use crate::ruleset::{OwnershipRule, RuleSet};

/// The outcome of parsing a rule file.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed rule set (possibly partial if lines were skipped).
    pub ruleset: RuleSet,
    /// Warnings for the lines that were skipped.
    pub warnings: Vec<ParseWarning>,
}

impl ParseResult {
    /// Returns true if no lines were skipped.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Returns true if any line was skipped with a warning.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Parses rule-file text into an ordered rule set.
///
/// Rule order in the output exactly matches line order in the input; the
/// first rule is the first non-skipped line. Owners keep their line order
/// and are not deduplicated.
pub fn parse_rules(content: &str) -> ParseResult {
    debug!("parsing rule file ({} bytes)", content.len());

    let mut rules = Vec::new();
    let mut warnings = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let line_num = line_idx + 1;

        if is_blank_line(line) || parse_comment_line(line).is_ok() {
            continue;
        }

        match parse_rule_components(line) {
            Ok((_, components)) => match Pattern::new(components.pattern) {
                Some(pattern) => {
                    let owners = components.owners.iter().map(|o| o.to_string()).collect();
                    rules.push(OwnershipRule::new(pattern, owners));
                }
                None => {
                    warn!(
                        "line {}: skipping invalid pattern '{}'",
                        line_num, components.pattern
                    );
                    warnings.push(ParseWarning::invalid_pattern(line_num, components.pattern));
                }
            },
            Err(_) => {
                warn!("line {}: skipping rule without owners: {}", line_num, line.trim());
                warnings.push(ParseWarning::missing_owners(line_num, line.trim()));
            }
        }
    }

    debug!("parsed {} rules, {} warnings", rules.len(), warnings.len());

    ParseResult {
        ruleset: RuleSet::new(rules, content),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_file() {
        let result = parse_rules("");
        assert!(result.is_clean());
        assert!(result.ruleset.is_empty());
    }

    #[test]
    fn parse_blank_and_comment_lines() {
        let result = parse_rules("\n   \n# comment\n  # indented comment\n\t\n");
        assert!(result.is_clean());
        assert!(result.ruleset.is_empty());
    }

    #[test]
    fn parse_simple_rule() {
        let result = parse_rules("*.rs @rustacean\n");
        assert!(result.is_clean());
        assert_eq!(result.ruleset.len(), 1);

        let rule = &result.ruleset.rules()[0];
        assert_eq!(rule.pattern(), "*.rs");
        assert_eq!(rule.owners(), ["@rustacean"]);
    }

    #[test]
    fn owners_keep_line_order_and_duplicates() {
        let result = parse_rules("/src/ @dev @acme/core @dev\n");
        let rule = &result.ruleset.rules()[0];
        assert_eq!(rule.owners(), ["@dev", "@acme/core", "@dev"]);
    }

    #[test]
    fn rules_keep_file_order() {
        let input = "# header\n\n*.rs @rust\n/docs/ @docs-team\n*.js @frontend\n";
        let result = parse_rules(input);
        let patterns: Vec<_> = result.ruleset.rules().iter().map(|r| r.pattern()).collect();
        assert_eq!(patterns, vec!["*.rs", "/docs/", "*.js"]);
    }

    #[test]
    fn malformed_line_skipped_with_warning() {
        let result = parse_rules("single-pattern-no-owners\n*.js @frontend\n");

        assert!(result.has_warnings());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].line(), 1);

        // The well-formed line directly after still parses.
        assert_eq!(result.ruleset.len(), 1);
        assert_eq!(result.ruleset.rules()[0].pattern(), "*.js");
    }

    #[test]
    fn pattern_with_trailing_whitespace_and_no_owners_is_skipped() {
        let result = parse_rules("*.rs   \n");
        assert!(result.has_warnings());
        assert!(result.ruleset.is_empty());
        assert!(matches!(
            result.warnings[0],
            ParseWarning::MissingOwners { line: 1, .. }
        ));
    }

    #[test]
    fn invalid_glob_skipped_with_warning() {
        let result = parse_rules("src/[broken @owner\n*.md @docs\n");
        assert!(result.has_warnings());
        assert!(matches!(
            result.warnings[0],
            ParseWarning::InvalidPattern { line: 1, .. }
        ));
        assert_eq!(result.ruleset.len(), 1);
        assert_eq!(result.ruleset.rules()[0].pattern(), "*.md");
    }

    #[test]
    fn raw_text_is_preserved() {
        let input = "# header\n*.rs @rust\n";
        let result = parse_rules(input);
        assert_eq!(result.ruleset.raw_text(), input);
    }

    #[test]
    fn parse_is_idempotent() {
        let input = "*.rs @rust @tools\n/docs/ @docs-team\nbad-line\n*.js @frontend\n";
        let first = parse_rules(input);
        let second = parse_rules(input);

        assert_eq!(first.ruleset, second.ruleset);
        assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn crlf_line_endings() {
        let result = parse_rules("*.rs @rust\r\n*.js @frontend\r\n");
        assert!(result.is_clean());
        assert_eq!(result.ruleset.len(), 2);
    }
}
