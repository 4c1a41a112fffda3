//! Pattern matching for CODEOWNERS rules.
//!
//! This module implements gitignore-style pattern matching as GitHub applies
//! it to CODEOWNERS files:
//!
//! - `*` matches any sequence of non-slash characters
//! - `**` matches any sequence including slashes (any path)
//! - one leading `/` is stripped; multi-segment patterns like `/src/*.rs`
//!   are then repo-root relative, while a pattern whose remainder has no
//!   `/` (e.g. `/*.rs`) falls under the bare-pattern rule below
//! - `/` at the end turns the pattern into a directory pattern that owns
//!   everything beneath it
//! - a pattern without any `/` matches that file name at any depth
//! - dot-files are matchable (`*.md` matches `.README.md`)

use globset::{GlobBuilder, GlobMatcher};

/// A compiled CODEOWNERS pattern that can match file paths.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The original pattern string.
    original: String,
    /// The compiled glob matcher.
    matcher: GlobMatcher,
    /// `**/`-prefixed matcher, compiled only for bare file-name patterns.
    /// Tried when the primary matcher misses, so `*.js` matches both
    /// `app.js` and `src/deep/app.js`.
    fallback: Option<GlobMatcher>,
    /// Whether this pattern was written with a leading slash.
    anchored: bool,
    /// Whether this pattern was written as a directory pattern.
    directory: bool,
}

impl Pattern {
    /// Compiles a CODEOWNERS pattern for matching.
    ///
    /// Returns `None` if the pattern is not a valid glob.
    pub fn new(pattern: &str) -> Option<Self> {
        let original = pattern.to_string();
        let anchored = pattern.starts_with('/');

        // One leading slash is stripped before matching; a remainder with
        // no slash of its own gets the bare-pattern fallback below.
        let mut normalized = pattern.strip_prefix('/').unwrap_or(pattern).to_string();

        let directory = normalized.ends_with('/');
        if directory {
            // "docs/" owns everything beneath docs.
            normalized.push_str("**");
        }

        let matcher = compile(&normalized)?;
        let fallback = if !normalized.contains('/') && !normalized.starts_with("**/") {
            Some(compile(&format!("**/{}", normalized))?)
        } else {
            None
        };

        Some(Self {
            original,
            matcher,
            fallback,
            anchored,
            directory,
        })
    }

    /// Returns the original pattern string.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Returns true if this pattern was written with a leading slash.
    ///
    /// Purely descriptive: the slash is stripped before matching, so a
    /// single-segment pattern like `/*.rs` still matches at any depth via
    /// the bare-pattern fallback.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Returns true if this pattern was written with a trailing slash.
    pub fn is_directory(&self) -> bool {
        self.directory
    }

    /// Checks if this pattern matches the given path.
    ///
    /// The path should be relative to the repository root and use forward
    /// slashes. A bare file-name pattern is tried as written first, then
    /// re-tried with a `**/` prefix.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.strip_prefix('/').unwrap_or(path);
        if self.matcher.is_match(path) {
            return true;
        }
        self.fallback.as_ref().is_some_and(|m| m.is_match(path))
    }
}

/// Compiles a glob with `*` confined to a single path component.
fn compile(glob: &str) -> Option<GlobMatcher> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .ok()
        .map(|glob| glob.compile_matcher())
}

/// Checks whether `path` matches `pattern` under CODEOWNERS semantics.
///
/// Convenience wrapper over [`Pattern::new`] for one-off checks; an invalid
/// pattern matches nothing.
pub fn pattern_matches(path: &str, pattern: &str) -> bool {
    Pattern::new(pattern).is_some_and(|p| p.matches(path))
}
