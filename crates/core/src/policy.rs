//! Package-level scan and mutation policy.
//!
//! Provides [`PackagePolicy`] which encapsulates the `ignore` and `exempt`
//! lists from [`ResolutionConfig`](crate::config::ResolutionConfig):
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | Name matches an ignore pattern | `Ignored` (never scanned) |
//! | Name is in the exempt list | `Exempt` (scanned, never modified) |
//! | None of the above | `Allow` |
//!
//! Ignore patterns are globs; both they and exempt names compare
//! case-insensitively.

use tracing::debug;

/// The outcome of evaluating a package against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageDecision {
    /// Scan the package and apply its plans.
    Allow,
    /// Leave the package out of conflict detection.
    Ignored { pattern: String },
    /// Scan the package but never touch its manifest.
    Exempt,
}

impl PackageDecision {
    /// `true` if the package takes part in conflict detection.
    pub fn is_scanned(&self) -> bool {
        !matches!(self, Self::Ignored { .. })
    }

    /// Short human-readable label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Ignored { .. } => "ignored",
            Self::Exempt => "exempt",
        }
    }
}

/// Evaluates package names against the ignore and exempt lists.
#[derive(Debug, Clone, Default)]
pub struct PackagePolicy {
    /// Lowercased glob patterns.
    ignore_patterns: Vec<String>,
    /// Lowercased package names.
    exempt: Vec<String>,
}

impl PackagePolicy {
    pub fn new(ignore_patterns: Vec<String>, exempt: Vec<String>) -> Self {
        Self {
            ignore_patterns: ignore_patterns.iter().map(|p| p.to_lowercase()).collect(),
            exempt: exempt.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Policy that exempts the given packages and ignores nothing.
    pub fn exempting<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            Vec::new(),
            names.into_iter().map(|s| s.as_ref().to_string()).collect(),
        )
    }

    /// Evaluate a package name. Ignoring wins over exemption.
    pub fn evaluate(&self, package: &str) -> PackageDecision {
        if let Some(pattern) = self.ignore_match(package) {
            debug!(package, pattern, "package ignored by pattern");
            return PackageDecision::Ignored {
                pattern: pattern.to_string(),
            };
        }
        if self.is_exempt(package) {
            return PackageDecision::Exempt;
        }
        PackageDecision::Allow
    }

    /// Whether the package's manifest must never be modified.
    pub fn is_exempt(&self, package: &str) -> bool {
        let name = package.to_lowercase();
        self.exempt.iter().any(|e| *e == name)
    }

    pub fn is_ignored(&self, package: &str) -> bool {
        self.ignore_match(package).is_some()
    }

    pub fn has_constraints(&self) -> bool {
        !self.ignore_patterns.is_empty() || !self.exempt.is_empty()
    }

    fn ignore_match(&self, package: &str) -> Option<&str> {
        let name = package.to_lowercase();
        self.ignore_patterns
            .iter()
            .find(|pattern| glob_match::glob_match(pattern, &name))
            .map(String::as_str)
    }
}
