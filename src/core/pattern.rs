//! # Topic pattern matching.
//!
//! Shell-glob matching over topic strings with path semantics:
//! - `*` matches any run of characters except `/`
//! - `?` matches any single character except `/`
//! - `[...]` matches a character class (`[!...]` negates)
//! - `\` escapes the next character
//!
//! Resolution is **bidirectional**: a registered key `K` matches a query `Q` if
//! `Q` matches `K` as a pattern **or** `K` matches `Q` as a pattern. That lets a
//! literal subscriber receive an event emitted to a pattern, and a pattern
//! subscriber receive a literal emit.
//!
//! ## Rules
//! - A malformed pattern never fails the caller; it matches nothing, not even
//!   an identical string.
//! - Strings without glob metacharacters are compared literally (no compile).
//! - Topic and middleware registries resolve through the same [`Query`].

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::error::PatternError;

const META: &[char] = &['*', '?', '[', '{', '\\'];

/// Returns true if `s` contains a glob metacharacter.
#[inline]
pub(crate) fn is_pattern(s: &str) -> bool {
    s.contains(META)
}

/// Compiles `pattern` with path-like glob semantics.
pub(crate) fn compile(pattern: &str) -> Result<GlobMatcher, PatternError> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })?;
    Ok(glob.compile_matcher())
}

/// Matches `name` against `pattern`.
pub(crate) fn glob_match(pattern: &str, name: &str) -> Result<bool, PatternError> {
    if !is_pattern(pattern) {
        return Ok(pattern == name);
    }
    Ok(compile(pattern)?.is_match(name))
}

fn one_way(pattern: &str, name: &str) -> bool {
    match glob_match(pattern, name) {
        Ok(matched) => matched,
        Err(err) => {
            debug!(reason = err.as_label(), error = %err, "pattern treated as no match");
            false
        }
    }
}

/// Query compiled once and matched against many keys.
///
/// Used when one query is resolved against a whole registry; each key that is
/// itself a pattern is still compiled on demand.
pub(crate) struct Query<'a> {
    raw: &'a str,
    matcher: Option<GlobMatcher>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(raw: &'a str) -> Self {
        let matcher = if is_pattern(raw) {
            match compile(raw) {
                Ok(m) => Some(m),
                Err(err) => {
                    debug!(reason = err.as_label(), error = %err, "pattern treated as no match");
                    None
                }
            }
        } else {
            None
        };
        Self { raw, matcher }
    }

    /// Bidirectional match of this query against `key`.
    ///
    /// Malformed patterns on either side count as "no match".
    pub(crate) fn matches(&self, key: &str) -> bool {
        let forward = match &self.matcher {
            Some(m) => m.is_match(key),
            None => !is_pattern(self.raw) && self.raw == key,
        };
        forward || one_way(key, self.raw)
    }
}
