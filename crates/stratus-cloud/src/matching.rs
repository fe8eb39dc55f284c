//! Name matching policies for `find`
//!
//! Providers that filter by name server-side use their own semantics. When a
//! service has to filter client-side it picks one of these policies.

use crate::resource::Resource;
use glob::Pattern;

/// How a `find` name is compared with candidate names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact,
    Substring,

    /// fnmatch-style (`*`, `?`, `[...]`)
    Glob,
}

/// A compiled name filter
#[derive(Debug, Clone)]
pub struct NameFilter {
    policy: NameMatch,
    pattern: String,
    glob: Option<Pattern>,
}

impl NameFilter {
    pub fn new(policy: NameMatch, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let glob = match policy {
            // An invalid glob degrades to exact matching
            NameMatch::Glob => Pattern::new(&pattern).ok(),
            _ => None,
        };
        Self {
            policy,
            pattern,
            glob,
        }
    }

    pub fn exact(pattern: impl Into<String>) -> Self {
        Self::new(NameMatch::Exact, pattern)
    }

    pub fn substring(pattern: impl Into<String>) -> Self {
        Self::new(NameMatch::Substring, pattern)
    }

    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::new(NameMatch::Glob, pattern)
    }

    pub fn policy(&self) -> NameMatch {
        self.policy
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match self.policy {
            NameMatch::Exact => candidate == self.pattern,
            NameMatch::Substring => candidate.contains(&self.pattern),
            NameMatch::Glob => match &self.glob {
                Some(glob) => glob.matches(candidate),
                None => candidate == self.pattern,
            },
        }
    }

    /// Like `matches`, treating a missing name as a non-match
    pub fn matches_opt(&self, candidate: Option<&str>) -> bool {
        candidate.is_some_and(|c| self.matches(c))
    }

    /// Keep the resources whose name matches, preserving order
    pub fn retain<T: Resource>(&self, mut objects: Vec<T>) -> Vec<T> {
        objects.retain(|o| self.matches(o.name()));
        objects
    }
}
