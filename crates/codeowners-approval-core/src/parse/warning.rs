//! Warning types for rule-file parsing.
//!
//! Malformed lines never abort a parse; they are skipped and surfaced as
//! warnings so the rest of the file still takes effect.

use serde::Serialize;
use thiserror::Error;

/// A non-fatal problem found while parsing a rule file.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A rule line with no owner tokens after the pattern.
    #[error("line {line}: rule '{raw}' has no owners and was skipped")]
    MissingOwners {
        /// The line number where the warning occurred (1-based).
        line: usize,
        /// The offending line, trimmed.
        raw: String,
    },

    /// A pattern that does not compile as a glob.
    #[error("line {line}: pattern '{pattern}' is not a valid glob and was skipped")]
    InvalidPattern {
        /// The line number where the warning occurred (1-based).
        line: usize,
        /// The pattern text that failed to compile.
        pattern: String,
    },
}

impl ParseWarning {
    /// Creates a missing-owners warning.
    pub fn missing_owners(line: usize, raw: impl Into<String>) -> Self {
        Self::MissingOwners {
            line,
            raw: raw.into(),
        }
    }

    /// Creates an invalid-pattern warning.
    pub fn invalid_pattern(line: usize, pattern: impl Into<String>) -> Self {
        Self::InvalidPattern {
            line,
            pattern: pattern.into(),
        }
    }

    /// Returns the line number where this warning occurred.
    pub fn line(&self) -> usize {
        match self {
            ParseWarning::MissingOwners { line, .. } => *line,
            ParseWarning::InvalidPattern { line, .. } => *line,
        }
    }
}
