use crate::rules::{ExclusionRule, Location, ReplacementRule, RuleKind};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PublishConfig {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub folders: Vec<FolderEntry>,
}

impl PublishConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.profiles.is_empty() {
            issues.push(ValidationIssue::EmptyProfileList);
        }

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if profile.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    owner: None,
                    field: "profiles.name",
                });
            } else if !seen.insert(profile.name.as_str()) {
                issues.push(ValidationIssue::DuplicateProfile {
                    name: profile.name.clone(),
                });
            }
            if profile.publishing_path.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    owner: Some(format!("profile '{}'", profile.name)),
                    field: "publishing_path",
                });
            }
            let owner = format!("profile '{}'", profile.name);
            check_rules(&owner, &profile.exclude, &profile.replace, &mut issues);
        }

        for folder in &self.folders {
            let owner = format!("folder '{}'", folder.path);
            if folder.path.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    owner: None,
                    field: "folders.path",
                });
            } else if !is_contained(&folder.path) {
                issues.push(ValidationIssue::InvalidCombo {
                    owner: Some(owner.clone()),
                    message: "path must be relative and stay inside the working root".to_string(),
                });
            }
            if folder.levels == Some(0) {
                issues.push(ValidationIssue::InvalidCombo {
                    owner: Some(owner.clone()),
                    message: "levels must be at least 1".to_string(),
                });
            }
            check_rules(&owner, &folder.exclude, &folder.replace, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Anchor relative publishing paths at `base`, usually the directory
    /// holding the config file.
    pub fn resolve_publishing_paths(&mut self, base: &Path) {
        for profile in &mut self.profiles {
            let path = Path::new(&profile.publishing_path);
            if path.is_relative() {
                profile.publishing_path = base.join(path).to_string_lossy().into_owned();
            }
        }
    }
}

fn check_rules(
    owner: &str,
    exclude: &[ExcludeDef],
    replace: &[ReplaceDef],
    issues: &mut Vec<ValidationIssue>,
) {
    for def in exclude {
        if def.expression.is_empty() {
            issues.push(ValidationIssue::MissingField {
                owner: Some(owner.to_string()),
                field: "exclude.expression",
            });
        } else if let Err(e) = def.compile() {
            issues.push(ValidationIssue::InvalidPattern {
                owner: owner.to_string(),
                pattern: def.expression.clone(),
                message: e.to_string(),
            });
        }
    }
    for def in replace {
        if def.expression.is_empty() {
            issues.push(ValidationIssue::MissingField {
                owner: Some(owner.to_string()),
                field: "replace.expression",
            });
        } else if let Err(e) = def.compile() {
            issues.push(ValidationIssue::InvalidPattern {
                owner: owner.to_string(),
                pattern: def.expression.clone(),
                message: e.to_string(),
            });
        }
    }
}

fn is_contained(path: &str) -> bool {
    let path = Path::new(path);
    !path.has_root()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// A named publishing target.
#[derive(Debug, Deserialize, Clone)]
pub struct Profile {
    pub name: String,
    pub publishing_path: String,
    /// Profile-scope exclusions, appended after each folder's own.
    #[serde(default)]
    pub exclude: Vec<ExcludeDef>,
    /// Profile-scope replacements, appended after each folder's own.
    #[serde(default)]
    pub replace: Vec<ReplaceDef>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FolderEntry {
    pub path: String,
    #[serde(default)]
    pub copy_method: CopyMethod,
    /// Recursion depth limit; 1 syncs only the files directly in `path`.
    #[serde(default)]
    pub levels: Option<usize>,
    #[serde(default)]
    pub exclude: Vec<ExcludeDef>,
    #[serde(default)]
    pub replace: Vec<ReplaceDef>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CopyMethod {
    #[default]
    Pubsync,
    Mirror,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExcludeDef {
    pub expression: String,
    #[serde(rename = "type")]
    pub kind: RuleKind,
    #[serde(default)]
    pub invert: bool,
    #[serde(default)]
    pub location: Location,
}

impl ExcludeDef {
    pub fn compile(&self) -> Result<ExclusionRule, regex::Error> {
        Ok(ExclusionRule::new(&self.expression)?
            .with_kind(self.kind)
            .with_location(self.location)
            .inverted(self.invert))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaceDef {
    pub expression: String,
    #[serde(default)]
    pub replacement: String,
}

impl ReplaceDef {
    pub fn compile(&self) -> Result<ReplacementRule, regex::Error> {
        ReplacementRule::new(&self.expression, &self.replacement)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyProfileList,
    DuplicateProfile {
        name: String,
    },
    MissingField {
        owner: Option<String>,
        field: &'static str,
    },
    InvalidPattern {
        owner: String,
        pattern: String,
        message: String,
    },
    InvalidCombo {
        owner: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyProfileList => write!(f, "publish config contains no profiles"),
            ValidationIssue::DuplicateProfile { name } => {
                write!(f, "profile '{name}' is declared more than once")
            }
            ValidationIssue::MissingField { owner, field } => match owner {
                Some(owner) => write!(f, "{owner} missing required field '{field}'"),
                None => write!(f, "entry missing required field '{field}'"),
            },
            ValidationIssue::InvalidPattern {
                owner,
                pattern,
                message,
            } => write!(f, "{owner} has invalid expression '{pattern}': {message}"),
            ValidationIssue::InvalidCombo { owner, message } => match owner {
                Some(owner) => write!(f, "{owner} has invalid configuration: {message}"),
                None => write!(f, "invalid publish configuration: {message}"),
            },
        }
    }
}
