//! Memoized rule-set parsing.
//!
//! Rule-file content does not change during a run, so parsing is a pure
//! function of the text. [`RuleSetCache`] memoizes the most recent parse and
//! hands out shared references; callers that need a guaranteed-fresh parse
//! (tests, or a rule file known to have changed mid-process) call
//! [`RuleSetCache::invalidate`] first.

use std::sync::{Arc, Mutex, PoisonError};

use log::{trace, warn};

use crate::parse::parse_rules;
use crate::ruleset::RuleSet;

#[derive(Debug)]
struct CacheEntry {
    text: String,
    ruleset: Arc<RuleSet>,
}

/// A single-entry cache keyed by rule-file text.
///
/// Safe to share between concurrent evaluations; the entry is written under
/// a mutex and immutable once handed out.
#[derive(Debug, Default)]
pub struct RuleSetCache {
    entry: Mutex<Option<CacheEntry>>,
}

impl RuleSetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rule set for `text`, parsing on a miss.
    ///
    /// Warnings from a fresh parse are logged; a cache hit emits nothing,
    /// since the identical text was already reported once.
    pub fn get_or_parse(&self, text: &str) -> Arc<RuleSet> {
        let mut guard = self.entry.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = guard.as_ref() {
            if entry.text == text {
                trace!("rule set cache hit");
                return Arc::clone(&entry.ruleset);
            }
        }

        let result = parse_rules(text);
        for warning in &result.warnings {
            warn!("{}", warning);
        }

        let ruleset = Arc::new(result.ruleset);
        *guard = Some(CacheEntry {
            text: text.to_string(),
            ruleset: Arc::clone(&ruleset),
        });
        ruleset
    }

    /// Drops the cached entry so the next call parses fresh.
    pub fn invalidate(&self) {
        let mut guard = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_reuses_the_parse() {
        let cache = RuleSetCache::new();
        let first = cache.get_or_parse("*.rs @rust\n");
        let second = cache.get_or_parse("*.rs @rust\n");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn different_text_parses_fresh() {
        let cache = RuleSetCache::new();
        let first = cache.get_or_parse("*.rs @rust\n");
        let second = cache.get_or_parse("*.js @frontend\n");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.rules()[0].pattern(), "*.js");
    }

    #[test]
    fn invalidate_forces_a_reparse() {
        let cache = RuleSetCache::new();
        let first = cache.get_or_parse("*.rs @rust\n");
        cache.invalidate();
        let second = cache.get_or_parse("*.rs @rust\n");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }
}
