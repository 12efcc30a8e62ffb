//! File matching with glob patterns.
//!
//! Patterns follow the gitignore conventions hooks are configured with:
//!
//! - a pattern without `/` matches the file name in any directory
//! - a pattern containing `/` matches the path from the repository root
//! - a trailing `/` matches everything below a directory
//! - a leading `!` excludes files matched by earlier patterns
//!
//! The last pattern matching a path decides, so a later include brings back
//! a file an earlier `!` pattern excluded.

use glob::{MatchOptions, Pattern};

use crate::error::DoconlyError;
use crate::Result;

const PATH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct Rule {
    pattern: Pattern,
    anchored: bool,
    negated: bool,
}

impl Rule {
    fn new(pattern: &str, negated: bool) -> Result<Self> {
        let trimmed = pattern.trim_start_matches('/');
        let anchored = trimmed.contains('/');
        let source = if trimmed.ends_with('/') {
            format!("{trimmed}**")
        } else {
            trimmed.to_string()
        };
        let pattern = Pattern::new(&source).map_err(|e| DoconlyError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            anchored,
            negated,
        })
    }

    fn matches(&self, path: &str) -> bool {
        if self.anchored {
            self.pattern.matches_with(path, PATH_OPTIONS)
        } else {
            let name = path.rsplit('/').next().unwrap_or(path);
            self.pattern.matches_with(name, PATH_OPTIONS)
        }
    }
}

/// Configuration for file filtering.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Include and exclude patterns in the order they were added
    rules: Vec<Rule>,
}

impl FilterConfig {
    /// Create a new empty filter config (matches nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from pattern lines, `!` marking exclusions.
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut filter = Self::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            filter = match line.strip_prefix('!') {
                Some(pattern) => filter.exclude(pattern)?,
                None => filter.include(line)?,
            };
        }
        Ok(filter)
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.rules.push(Rule::new(pattern, false)?);
        Ok(self)
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.rules.push(Rule::new(pattern, true)?);
        Ok(self)
    }

    /// Check if a repository-relative path matches the filter.
    ///
    /// The last pattern matching the path decides; a path no pattern matches
    /// is not matched.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./");
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(path))
            .is_some_and(|rule| !rule.negated)
    }
}
