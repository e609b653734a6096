use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which kind of entry a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    File,
    Folder,
    /// Accepted for compatibility; never equal to a scan-time kind.
    All,
}

/// Which snapshot a scan is building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Location {
    Source,
    Destination,
    #[default]
    All,
}

impl Location {
    /// True if a rule scoped to `self` applies while scanning `scan`.
    pub fn covers(self, scan: Location) -> bool {
        self == Location::All || self == scan
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Source => f.write_str("source"),
            Location::Destination => f.write_str("destination"),
            Location::All => f.write_str("all"),
        }
    }
}

/// A single compiled exclusion predicate.
#[derive(Debug, Clone)]
pub struct ExclusionRule {
    expression: Regex,
    kind: RuleKind,
    invert: bool,
    location: Location,
}

impl ExclusionRule {
    /// Compile `pattern` case-insensitively. Defaults to a file rule that
    /// applies to both snapshots.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let expression = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            expression,
            kind: RuleKind::File,
            invert: false,
            location: Location::All,
        })
    }

    pub fn with_kind(mut self, kind: RuleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    pub fn pattern(&self) -> &str {
        self.expression.as_str()
    }

    /// Regex match against the full path, XOR'd with the invert flag.
    pub fn is_match(&self, full_path: &str) -> bool {
        self.expression.is_match(full_path) != self.invert
    }
}

/// Ordered, OR-combined collection of exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRuleSet {
    rules: Vec<ExclusionRule>,
}

impl ExclusionRuleSet {
    pub fn new(rules: Vec<ExclusionRule>) -> Self {
        Self { rules }
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = ExclusionRule>) {
        self.rules.extend(rules);
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Any rule of `kind` scoped to `location` that matches `full_path` excludes it.
    pub fn is_excluded(&self, full_path: &str, kind: RuleKind, location: Location) -> bool {
        self.rules.iter().any(|rule| {
            rule.location.covers(location) && rule.kind == kind && rule.is_match(full_path)
        })
    }

    pub fn is_path_excluded(&self, path: &Path, kind: RuleKind, location: Location) -> bool {
        self.is_excluded(&path.to_string_lossy(), kind, location)
    }
}
