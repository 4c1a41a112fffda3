//! CODEOWNERS Approval Core
//!
//! A library that decides which owner groups must approve a pull request and
//! whether each group's approval condition is satisfied.
//!
//! # Features
//!
//! - **Parser**: Turn CODEOWNERS text into an ordered rule set, skipping
//!   malformed lines with warnings
//! - **Matching**: GitHub's gitignore-style pattern semantics with
//!   last-match-wins precedence
//! - **Membership**: Expand `@org/team` handles through a pluggable
//!   directory, degrading gracefully on lookup failure
//! - **Aggregation**: Collapse review histories to latest-per-reviewer and
//!   compute per-group and overall verdicts
//!
//! # Quick Start
//!
//! ```rust
//! use codeowners_approval_core::parse::parse_rules;
//! use codeowners_approval_core::ruleset::OwnershipMapping;
//!
//! let rules = parse_rules("*.js @acme/frontend\n/docs/ @writer\n").ruleset;
//!
//! assert_eq!(rules.owners_for("src/app.js"), ["@acme/frontend"]);
//!
//! let changed = vec!["src/app.js".to_string(), "docs/guide.md".to_string()];
//! let mapping = OwnershipMapping::build(&rules, &changed);
//! assert_eq!(mapping.requirements().len(), 2);
//! ```
//!
//! Review aggregation lives in [`approval`]; it is async because team
//! membership comes from an external directory (see
//! [`membership::TeamDirectory`]).

pub mod approval;
pub mod cache;
pub mod matching;
pub mod membership;
pub mod parse;
pub mod ruleset;

// Re-export commonly used types at the crate root
pub use approval::{
    ApprovalCheckResult, OwnerApprovalStatus, ReviewEvent, ReviewState, evaluate_approvals,
    evaluate_owner,
};
pub use cache::RuleSetCache;
pub use matching::{Pattern, pattern_matches};
pub use membership::{
    DirectoryError, MembershipSource, OwnerMembership, TeamDirectory, resolve_members,
};
pub use parse::{ParseResult, ParseWarning, parse_rules};
pub use ruleset::{OwnerRequirement, OwnershipMapping, OwnershipRule, RuleSet, find_orphans};

/// Candidate locations for the rule file, in lookup order; the first one
/// that exists wins.
pub const CODEOWNERS_LOCATIONS: [&str; 3] = [".github/CODEOWNERS", "CODEOWNERS", ".CODEOWNERS"];
