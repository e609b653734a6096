use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

/// One rename step: every match of `expression` is replaced with `replacement`.
///
/// Replacement text may reference capture groups (`$1`, `${name}`).
#[derive(Debug, Clone)]
pub struct ReplacementRule {
    expression: Regex,
    replacement: String,
}

impl ReplacementRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        let expression = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            expression,
            replacement: replacement.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.expression.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        self.expression.replace_all(input, self.replacement.as_str())
    }
}

/// Ordered list of replacement rules, folded left to right.
#[derive(Debug, Clone, Default)]
pub struct ReplacementChain {
    rules: Vec<ReplacementRule>,
}

impl ReplacementChain {
    pub fn new(rules: Vec<ReplacementRule>) -> Self {
        Self { rules }
    }

    pub fn extend(&mut self, rules: impl IntoIterator<Item = ReplacementRule>) {
        self.rules.extend(rules);
    }

    pub fn rules(&self) -> &[ReplacementRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Each rule's output feeds the next rule.
    pub fn apply(&self, path: &str) -> String {
        self.rules
            .iter()
            .fold(path.to_string(), |current, rule| {
                rule.apply(&current).into_owned()
            })
    }
}
