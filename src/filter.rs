//! Prefix and glob filtering of route patterns.
//!
//! Patterns are compared without their leading `/`, and `*` crosses segment
//! boundaries, so `telescope*` excludes `telescope/requests/{id}` as well.

use crate::error::{Error, Result};
use glob::Pattern;

#[derive(Debug, Clone)]
pub struct RouteFilter {
    prefix: String,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl RouteFilter {
    /// Compile a filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty prefix or a malformed glob, naming
    /// the offending option.
    pub fn new(prefix: &str, include: &[String], exclude: &[String]) -> Result<Self> {
        let prefix = prefix.trim().trim_matches('/');
        if prefix.is_empty() {
            return Err(Error::configuration("path_prefix", "prefix must not be empty"));
        }

        Ok(Self {
            prefix: prefix.to_string(),
            include: compile("include_patterns", include)?,
            exclude: compile("exclude_patterns", exclude)?,
        })
    }

    /// Whether a raw route pattern is in scope.
    ///
    /// A route is kept when it starts with the prefix, matches at least one include
    /// pattern (if any are given), and matches no exclude pattern. Exclusion wins.
    pub fn matches(&self, pattern: &str) -> bool {
        let candidate = pattern.trim().trim_start_matches('/');

        if !candidate.starts_with(&self.prefix) {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(candidate)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(candidate))
    }
}

fn compile(option: &str, patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|raw| raw.trim().trim_start_matches('/'))
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            Pattern::new(raw).map_err(|e| {
                Error::configuration(option, format!("invalid glob `{}`: {}", raw, e))
            })
        })
        .collect()
}
