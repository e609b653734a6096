//! Exclusion and path-rewriting rules.
//!
//! Rules are declared at two scopes: on a folder entry and on the profile.
//! [`EffectiveRules`] merges both once per folder sync, folder rules first.

pub mod exclusion;
pub mod replacement;

pub use exclusion::{ExclusionRule, ExclusionRuleSet, Location, RuleKind};
pub use replacement::{ReplacementChain, ReplacementRule};

use crate::config::{FolderEntry, Profile};

/// The rules in force for one folder sync.
#[derive(Debug, Clone, Default)]
pub struct EffectiveRules {
    pub exclusions: ExclusionRuleSet,
    pub replacements: ReplacementChain,
}

impl EffectiveRules {
    /// Compile folder-scope rules followed by profile-scope rules.
    pub fn merge(folder: &FolderEntry, profile: &Profile) -> Result<Self, regex::Error> {
        let exclusions = folder
            .exclude
            .iter()
            .chain(&profile.exclude)
            .map(|def| def.compile())
            .collect::<Result<Vec<_>, _>>()?;
        let replacements = folder
            .replace
            .iter()
            .chain(&profile.replace)
            .map(|def| def.compile())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclusions: ExclusionRuleSet::new(exclusions),
            replacements: ReplacementChain::new(replacements),
        })
    }
}
