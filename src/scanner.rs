//! Recursive tree scanning into flat snapshots.
//!
//! A [`Snapshot`] maps a root-relative key (lowercase, `/`-separated) to the
//! size and last-write time of the file found there. Folders matched by a
//! folder exclusion are pruned, so nothing beneath them is ever visited.

use crate::rules::{ExclusionRuleSet, Location, RuleKind};
use filetime::FileTime;
use std::collections::btree_map::{self, BTreeMap};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// One regular file discovered during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file on disk
    pub path: PathBuf,
    /// Root-relative path, `/`-separated, original case
    pub relative: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: FileTime,
}

impl FileEntry {
    pub fn from_metadata(
        path: impl Into<PathBuf>,
        relative: impl Into<String>,
        metadata: &std::fs::Metadata,
    ) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
            size: metadata.len(),
            modified: FileTime::from_last_modification_time(metadata),
        }
    }

    /// Size and whole-second modification time are equal.
    ///
    /// Sub-second precision is ignored because filesystems disagree on it;
    /// comparing it would report freshly copied files as changed.
    pub fn is_same_as(&self, other: &FileEntry) -> bool {
        self.size == other.size && self.modified.unix_seconds() == other.modified.unix_seconds()
    }
}

/// Problems that do not stop a scan but must be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanIssue {
    /// Two paths fold to the same key; the first in name order is kept.
    CaseCollision {
        key: String,
        kept: PathBuf,
        dropped: PathBuf,
    },
    /// An entry below the root could not be read.
    Unreadable { path: PathBuf, message: String },
}

impl ScanIssue {
    pub fn path(&self) -> &Path {
        match self {
            ScanIssue::CaseCollision { dropped, .. } => dropped,
            ScanIssue::Unreadable { path, .. } => path,
        }
    }
}

impl std::fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanIssue::CaseCollision { key, kept, dropped } => write!(
                f,
                "{} collides with {} on key '{}' and was ignored",
                dropped.display(),
                kept.display(),
                key
            ),
            ScanIssue::Unreadable { path, message } => {
                write!(f, "cannot read {}: {}", path.display(), message)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot list root directory {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Flat map from relative key to file metadata for one root.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: BTreeMap<String, FileEntry>,
    issues: Vec<ScanIssue>,
}

impl Snapshot {
    pub fn get(&self, key: &str) -> Option<&FileEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, FileEntry> {
        self.entries.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, FileEntry> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn issues(&self) -> &[ScanIssue] {
        &self.issues
    }

    fn insert(&mut self, key: String, entry: FileEntry) {
        match self.entries.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            btree_map::Entry::Occupied(slot) => {
                self.issues.push(ScanIssue::CaseCollision {
                    key: slot.key().clone(),
                    kept: slot.get().path.clone(),
                    dropped: entry.path,
                });
            }
        }
    }
}

/// Root-relative, `/`-separated form of `path`. The snapshot key is this
/// string lowercased.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Depth-first scanner applying an exclusion rule set.
#[derive(Debug, Clone, Copy)]
pub struct TreeScanner<'a> {
    rules: &'a ExclusionRuleSet,
    max_depth: Option<usize>,
}

impl<'a> TreeScanner<'a> {
    pub fn new(rules: &'a ExclusionRuleSet) -> Self {
        Self {
            rules,
            max_depth: None,
        }
    }

    /// Limit recursion; depth 1 means only files directly in the root.
    pub fn with_max_depth(mut self, levels: Option<usize>) -> Self {
        self.max_depth = levels;
        self
    }

    /// Scan `root`, evaluating location-scoped rules against `location`.
    ///
    /// `root` should be absolute: exclusion patterns see full paths.
    pub fn scan(&self, root: &Path, location: Location) -> Result<Snapshot, ScanError> {
        if root.exists() && !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let rules = self.rules;
        let iter = walker.into_iter().filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let excluded = rules.is_path_excluded(entry.path(), RuleKind::Folder, location);
            if excluded {
                debug!("Pruned folder ({}): {}", location, entry.path().display());
            }
            !excluded
        });

        let mut snapshot = Snapshot::default();
        for result in iter {
            let entry = match result {
                Ok(entry) => entry,
                Err(error) if error.depth() == 0 => {
                    return Err(ScanError::Root {
                        path: root.to_path_buf(),
                        source: error,
                    });
                }
                Err(error) => {
                    let path = error.path().unwrap_or(root).to_path_buf();
                    snapshot.issues.push(ScanIssue::Unreadable {
                        path,
                        message: error.to_string(),
                    });
                    continue;
                }
            };

            if entry.depth() == 0 || entry.file_type().is_dir() {
                continue;
            }
            if !entry.file_type().is_file() {
                debug!("Skipping non-regular entry: {}", entry.path().display());
                continue;
            }
            if rules.is_path_excluded(entry.path(), RuleKind::File, location) {
                debug!("Excluded file ({}): {}", location, entry.path().display());
                continue;
            }

            let Some(relative) = relative_path(root, entry.path()) else {
                continue;
            };
            match entry.metadata() {
                Ok(metadata) => {
                    let key = relative.to_lowercase();
                    let file = FileEntry::from_metadata(entry.path(), relative, &metadata);
                    snapshot.insert(key, file);
                }
                Err(error) => snapshot.issues.push(ScanIssue::Unreadable {
                    path: entry.path().to_path_buf(),
                    message: error.to_string(),
                }),
            }
        }

        Ok(snapshot)
    }
}
