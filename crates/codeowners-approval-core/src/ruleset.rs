//! Ordered ownership rules and path-to-owner resolution.
//!
//! A [`RuleSet`] holds the rules of a CODEOWNERS file in file order.
//! Resolution walks the rules in *reverse*: among all rules matching a path,
//! the one declared latest in the file governs. There is no notion of
//! pattern specificity beyond declaration order.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::matching::Pattern;

/// One (pattern, owners) pair from the rule file.
#[derive(Debug, Clone)]
pub struct OwnershipRule {
    pattern: Pattern,
    owners: Vec<String>,
}

impl OwnershipRule {
    /// Creates a rule from a compiled pattern and its owners.
    pub fn new(pattern: Pattern, owners: Vec<String>) -> Self {
        Self { pattern, owners }
    }

    /// Returns the original pattern text.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns the owners in line order (not deduplicated).
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// Checks whether this rule's pattern matches the given path.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

impl PartialEq for OwnershipRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str() && self.owners == other.owners
    }
}

impl Eq for OwnershipRule {}

/// The ordered rules of one rule file, plus the raw text they came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleSet {
    rules: Vec<OwnershipRule>,
    raw_text: String,
}

impl RuleSet {
    /// Creates a rule set from rules in file order.
    pub fn new(rules: Vec<OwnershipRule>, raw_text: impl Into<String>) -> Self {
        Self {
            rules,
            raw_text: raw_text.into(),
        }
    }

    /// Returns the rules in file order.
    pub fn rules(&self) -> &[OwnershipRule] {
        &self.rules
    }

    /// Returns the raw text the rule set was parsed from.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the set contains no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolves the owners responsible for a path.
    ///
    /// Rules declared later in the file override earlier ones for any path
    /// they also match, so the scan runs back to front and stops at the
    /// first hit. Returns an empty slice when no rule matches.
    pub fn owners_for(&self, path: &str) -> &[String] {
        for rule in self.rules.iter().rev() {
            if rule.matches(path) {
                return rule.owners();
            }
        }
        &[]
    }

    /// Groups changed paths by the owner responsible for them.
    ///
    /// Each owner gets one [`OwnerRequirement`] created on first occurrence;
    /// per-owner file lists are unique and keep first-seen order. A path
    /// matched by a rule with several owners is recorded under every one of
    /// them; a path with no owners contributes nothing.
    pub fn group_by_owner(&self, paths: &[String]) -> Vec<OwnerRequirement> {
        let mut order: Vec<String> = Vec::new();
        let mut files_by_owner: HashMap<String, Vec<String>> = HashMap::new();

        for path in paths {
            for owner in self.owners_for(path) {
                let files = files_by_owner.entry(owner.clone()).or_insert_with(|| {
                    order.push(owner.clone());
                    Vec::new()
                });
                if !files.iter().any(|f| f == path) {
                    files.push(path.clone());
                }
            }
        }

        order
            .into_iter()
            .map(|owner| {
                let files = files_by_owner.remove(&owner).unwrap_or_default();
                OwnerRequirement { owner, files }
            })
            .collect()
    }
}

/// An owner group and the changed files it is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRequirement {
    /// The owner handle as written in the rule file.
    pub owner: String,
    /// The files this owner must sign off on, unique, in first-seen order.
    pub files: Vec<String>,
}

/// Changed files that match no rule at all.
///
/// Purely informational; orphaned files never affect the verdict.
pub fn find_orphans(all_paths: &[String], requirements: &[OwnerRequirement]) -> Vec<String> {
    let owned: HashSet<&str> = requirements
        .iter()
        .flat_map(|req| req.files.iter().map(String::as_str))
        .collect();

    all_paths
        .iter()
        .filter(|path| !owned.contains(path.as_str()))
        .cloned()
        .collect()
}

/// The full picture of who must review a change set.
#[derive(Debug, Clone, Serialize)]
pub struct OwnershipMapping {
    requirements: Vec<OwnerRequirement>,
    all_files: Vec<String>,
}

impl OwnershipMapping {
    /// Maps changed paths to their required owners.
    ///
    /// Requirements are sorted by owner handle for stable reporting.
    pub fn build(ruleset: &RuleSet, paths: &[String]) -> Self {
        let mut requirements = ruleset.group_by_owner(paths);
        requirements.sort_by(|a, b| a.owner.cmp(&b.owner));

        debug!(
            "{} owner groups required for {} changed files",
            requirements.len(),
            paths.len()
        );

        Self {
            requirements,
            all_files: paths.to_vec(),
        }
    }

    /// Returns the per-owner requirements, sorted by owner handle.
    pub fn requirements(&self) -> &[OwnerRequirement] {
        &self.requirements
    }

    /// Returns the full changed-file list this mapping was built from.
    pub fn all_files(&self) -> &[String] {
        &self.all_files
    }

    /// Returns true if at least one owner group must review.
    pub fn has_requirements(&self) -> bool {
        !self.requirements.is_empty()
    }

    /// Changed files that match no rule.
    pub fn orphaned_files(&self) -> Vec<String> {
        find_orphans(&self.all_files, &self.requirements)
    }
}
