//! Folder synchronization engine.
//!
//! One call to [`SyncEngine::sync_folder`] scans the source and destination
//! roots, maps every source key through the replacement chain, classifies each
//! source file as new, changed or unchanged, copies what differs and finally
//! removes destination files no source maps to. Per-file failures are recorded
//! in the [`FolderReport`] and never abort the folder.

use crate::copy::copy_preserving_mtime;
use crate::rules::{EffectiveRules, Location};
use crate::scanner::{FileEntry, ScanError, ScanIssue, Snapshot, TreeScanner};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Mode flags for a run, fixed for the whole invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// When false nothing on disk is touched (dry run).
    pub sync_files: bool,
    /// When true destination-only files are kept.
    pub no_delete: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_files: true,
            no_delete: false,
        }
    }
}

impl SyncOptions {
    pub fn dry_run() -> Self {
        Self {
            sync_files: false,
            no_delete: false,
        }
    }

    pub fn additive() -> Self {
        Self {
            sync_files: true,
            no_delete: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to copy {from} to {to}: {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Failed to delete {path}: {error}")]
    Delete {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("'{key}' maps to destination '{dest_key}' already claimed by '{claimed_by}'")]
    DestinationCollision {
        key: String,
        dest_key: String,
        claimed_by: String,
    },

    #[error("'{key}' maps outside the destination root: '{dest_key}'")]
    EscapesDestination { key: String, dest_key: String },

    #[error("{0}")]
    Scan(ScanIssue),

    #[error(transparent)]
    ScanFailed(#[from] ScanError),

    #[error("Cannot resolve {path}: {error}")]
    Resolve {
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("Failed to create destination root {path}: {error}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Classification of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    Unchanged,
    New,
    Changed,
    Deleted,
}

/// A failed per-file step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub message: String,
}

/// Summary of one folder sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub unchanged: usize,
    pub new: usize,
    pub changed: usize,
    pub deleted: usize,
    pub errors: Vec<FileFailure>,
    pub elapsed: Duration,
    /// Nothing was mutated.
    pub dry_run: bool,
    /// The source root did not exist, so there was nothing to publish.
    pub source_missing: bool,
}

impl FolderReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn record(&mut self, path: &str, result: Result<FileOutcome, SyncError>) {
        match result {
            Ok(FileOutcome::Unchanged) => self.unchanged += 1,
            Ok(FileOutcome::New) => self.new += 1,
            Ok(FileOutcome::Changed) => self.changed += 1,
            Ok(FileOutcome::Deleted) => self.deleted += 1,
            Err(error) => {
                warn!("{}: {}", path, error);
                self.errors.push(FileFailure {
                    path: path.to_string(),
                    message: error.to_string(),
                });
            }
        }
    }
}

/// A source file together with where it lands.
#[derive(Debug)]
struct Planned<'s> {
    key: &'s str,
    entry: &'s FileEntry,
    /// Case-folded key used to look up the destination snapshot
    dest_key: String,
    /// Replacement output on the original-case path; names new files
    dest_rel: String,
}

/// Synchronizes one source folder into one destination folder.
#[derive(Debug, Clone, Copy)]
pub struct SyncEngine<'a> {
    rules: &'a EffectiveRules,
    options: SyncOptions,
    max_depth: Option<usize>,
}

impl<'a> SyncEngine<'a> {
    pub fn new(rules: &'a EffectiveRules, options: SyncOptions) -> Self {
        Self {
            rules,
            options,
            max_depth: None,
        }
    }

    pub fn with_max_depth(mut self, levels: Option<usize>) -> Self {
        self.max_depth = levels;
        self
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Make `dest_root` match `source_root`.
    ///
    /// Returns `Err` only for structural failures (a root that cannot be
    /// resolved, created or listed). Everything else lands in the report.
    pub fn sync_folder(
        &self,
        source_root: &Path,
        dest_root: &Path,
    ) -> Result<FolderReport, SyncError> {
        let started = Instant::now();
        let source_root = absolute(source_root)?;
        let dest_root = absolute(dest_root)?;

        let mut report = FolderReport {
            source: source_root.clone(),
            destination: dest_root.clone(),
            dry_run: !self.options.sync_files,
            ..FolderReport::default()
        };

        if !source_root.exists() {
            info!(
                "Folder {} does not exist on the source, nothing to publish",
                source_root.display()
            );
            report.source_missing = true;
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let scanner = TreeScanner::new(&self.rules.exclusions).with_max_depth(self.max_depth);
        let source = scanner.scan(&source_root, Location::Source)?;

        if !dest_root.exists() && self.options.sync_files {
            fs::create_dir_all(&dest_root).map_err(|error| SyncError::CreateRoot {
                path: dest_root.clone(),
                error,
            })?;
        }
        let dest = if dest_root.exists() {
            scanner.scan(&dest_root, Location::Destination)?
        } else {
            Snapshot::default()
        };

        info!(
            "Scanned {}: {} source files, {} destination files",
            source_root.display(),
            source.len(),
            dest.len()
        );

        for issue in source.issues().iter().chain(dest.issues()) {
            let path = issue.path().display().to_string();
            report.record(&path, Err(SyncError::Scan(issue.clone())));
        }

        let (plan, claimed) = self.plan(&source, &mut report);

        for planned in &plan {
            let result = self.sync_entry(planned, &dest, &dest_root);
            report.record(planned.key, result);
        }

        if self.options.sync_files && !self.options.no_delete {
            for (key, entry) in dest.iter().filter(|(key, _)| !claimed.contains_key(*key)) {
                let result = fs::remove_file(&entry.path)
                    .map(|()| {
                        debug!("Deleted: {}", key);
                        FileOutcome::Deleted
                    })
                    .map_err(|error| SyncError::Delete {
                        path: entry.path.clone(),
                        error,
                    });
                report.record(key, result);
            }
        }

        report.elapsed = started.elapsed();
        info!(
            "Synced {}: {} unchanged, {} new, {} changed, {} deleted, {} errors in {:?}",
            source_root.display(),
            report.unchanged,
            report.new,
            report.changed,
            report.deleted,
            report.error_count(),
            report.elapsed
        );
        Ok(report)
    }

    /// Map every source key to its destination key, once per run.
    ///
    /// The chain runs on the original-case relative path so new files keep
    /// their source casing; matching is case-insensitive, so lowercasing the
    /// output yields the same key as rewriting the folded key.
    /// Keys are visited in sorted order; when several source keys rewrite to
    /// the same destination the first one claims it and the rest fail.
    fn plan<'s>(
        &self,
        source: &'s Snapshot,
        report: &mut FolderReport,
    ) -> (Vec<Planned<'s>>, HashMap<String, &'s str>) {
        let mut plan = Vec::with_capacity(source.len());
        let mut claimed: HashMap<String, &'s str> = HashMap::with_capacity(source.len());

        for (key, entry) in source.iter() {
            let dest_rel = self.rules.replacements.apply(&entry.relative);
            let dest_key = dest_rel.to_lowercase();

            if !stays_inside(&dest_rel) {
                report.record(
                    key,
                    Err(SyncError::EscapesDestination {
                        key: key.clone(),
                        dest_key: dest_rel,
                    }),
                );
                continue;
            }

            if let Some(first) = claimed.get(&dest_key) {
                report.record(
                    key,
                    Err(SyncError::DestinationCollision {
                        key: key.clone(),
                        dest_key,
                        claimed_by: first.to_string(),
                    }),
                );
                continue;
            }

            claimed.insert(dest_key.clone(), key.as_str());
            plan.push(Planned {
                key,
                entry,
                dest_key,
                dest_rel,
            });
        }

        (plan, claimed)
    }

    fn sync_entry(
        &self,
        planned: &Planned<'_>,
        dest: &Snapshot,
        dest_root: &Path,
    ) -> Result<FileOutcome, SyncError> {
        let source = planned.entry;
        match dest.get(&planned.dest_key) {
            Some(existing) if source.is_same_as(existing) => Ok(FileOutcome::Unchanged),
            Some(existing) => {
                debug!("Changed: {} -> {}", planned.key, planned.dest_key);
                if self.options.sync_files {
                    copy(&source.path, &existing.path)?;
                }
                Ok(FileOutcome::Changed)
            }
            None => {
                debug!("New: {} -> {}", planned.key, planned.dest_rel);
                if self.options.sync_files {
                    copy(&source.path, &dest_root.join(&planned.dest_rel))?;
                }
                Ok(FileOutcome::New)
            }
        }
    }
}

fn copy(from: &Path, to: &Path) -> Result<(), SyncError> {
    copy_preserving_mtime(from, to)
        .map(|_| ())
        .map_err(|error| SyncError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error,
        })
}

fn absolute(path: &Path) -> Result<PathBuf, SyncError> {
    std::path::absolute(path).map_err(|error| SyncError::Resolve {
        path: path.to_path_buf(),
        error,
    })
}

fn stays_inside(rel: &str) -> bool {
    let path = Path::new(rel);
    !rel.is_empty()
        && !path.has_root()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
