//! Module exclusion by exact-name or dotted-prefix patterns.
//!
//! A pattern is either an exact module name (`object`) or a package prefix
//! ending in `.` (`std.`), which matches every module below that package.
//! Note that `std.` does not match a module named `std` itself.

use tracing::trace;

/// Runtime and standard-library modules that are never interesting in an
/// import graph and never compiled by the build driver.
pub const DEFAULT_IGNORES: &[&str] = &["object", "std.", "core.", "tango."];

/// Returns `true` if `name` matches `pattern` (exact, or dotted prefix).
#[must_use]
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    name == pattern || (pattern.ends_with('.') && name.starts_with(pattern))
}

/// Decides whether a module takes part in analysis.
///
/// With an empty include list the filter is exclude-only. A non-empty include
/// list switches it to exclude-unless-included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFilter {
    ignores: Vec<String>,
    includes: Vec<String>,
}

impl Default for ModuleFilter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ModuleFilter {
    /// Create a filter, optionally seeded with [`DEFAULT_IGNORES`].
    #[must_use]
    pub fn new(default_ignores: bool) -> Self {
        let ignores = if default_ignores {
            DEFAULT_IGNORES.iter().map(ToString::to_string).collect()
        } else {
            Vec::new()
        };
        Self {
            ignores,
            includes: Vec::new(),
        }
    }

    /// Add ignore patterns.
    #[must_use]
    pub fn with_ignores<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignores.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add include patterns.
    #[must_use]
    pub fn with_includes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn ignores(&self) -> &[String] {
        &self.ignores
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Returns `true` if `module` must be left out.
    #[must_use]
    pub fn is_excluded(&self, module: &str) -> bool {
        if self.ignores.iter().any(|p| matches_pattern(module, p)) {
            return true;
        }
        !self.includes.is_empty() && !self.includes.iter().any(|p| matches_pattern(module, p))
    }

    /// Returns `true` if an edge between the two modules survives. Each
    /// endpoint is judged by its own name.
    #[must_use]
    pub fn admits_edge(&self, from: &str, to: &str) -> bool {
        let keep = !self.is_excluded(from) && !self.is_excluded(to);
        if !keep {
            trace!(from, to, "edge filtered");
        }
        keep
    }
}
