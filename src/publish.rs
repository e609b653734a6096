//! Run every configured folder for one profile.
//!
//! Folders are processed sequentially in declaration order. A failure in one
//! folder is recorded and the run moves on; only an unknown profile stops the
//! whole invocation.

use crate::config::{CopyMethod, FolderEntry, Profile, PublishConfig};
use crate::engine::{FolderReport, SyncEngine, SyncOptions};
use crate::mirror::{run_mirror, MirrorReport, MirrorTool};
use crate::rules::EffectiveRules;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Profile '{0}' does not exist")]
    UnknownProfile(String),
}

/// Result for one configured folder.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FolderOutcome {
    Synced {
        folder: String,
        report: FolderReport,
    },
    Mirrored {
        folder: String,
        report: MirrorReport,
    },
    Failed {
        folder: String,
        reason: String,
    },
}

impl FolderOutcome {
    pub fn folder(&self) -> &str {
        match self {
            FolderOutcome::Synced { folder, .. }
            | FolderOutcome::Mirrored { folder, .. }
            | FolderOutcome::Failed { folder, .. } => folder,
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            FolderOutcome::Synced { report, .. } => report.is_success(),
            FolderOutcome::Mirrored { .. } => true,
            FolderOutcome::Failed { .. } => false,
        }
    }
}

/// Everything one `publish` call did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub profile: String,
    pub publishing_path: PathBuf,
    pub folders: Vec<FolderOutcome>,
}

impl RunReport {
    /// True when every folder succeeded.
    pub fn is_success(&self) -> bool {
        self.folders.iter().all(FolderOutcome::is_success)
    }
}

/// Options that are fixed for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct PublishOptions {
    pub sync: SyncOptions,
    pub mirror_tool: MirrorTool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            sync: SyncOptions::default(),
            mirror_tool: MirrorTool::platform_default(),
        }
    }
}

/// Publish every folder in `config` to the named profile.
///
/// Folder paths are resolved against `root`; each lands at
/// `publishing_path/<folder path>`.
pub fn publish(
    config: &PublishConfig,
    profile_name: &str,
    root: &Path,
    options: PublishOptions,
) -> Result<RunReport, PublishError> {
    let profile = config
        .profile(profile_name)
        .ok_or_else(|| PublishError::UnknownProfile(profile_name.to_string()))?;
    info!(
        "Publishing profile '{}' to {}",
        profile.name, profile.publishing_path
    );

    let publishing_path = PathBuf::from(&profile.publishing_path);
    let folders = config
        .folders
        .iter()
        .map(|folder| publish_folder(folder, profile, root, &publishing_path, options))
        .collect();

    Ok(RunReport {
        profile: profile.name.clone(),
        publishing_path,
        folders,
    })
}

fn publish_folder(
    folder: &FolderEntry,
    profile: &Profile,
    root: &Path,
    publishing_path: &Path,
    options: PublishOptions,
) -> FolderOutcome {
    let source = root.join(&folder.path);
    let dest = publishing_path.join(&folder.path);
    let name = folder.path.clone();

    let failed = |reason: String| {
        error!("Folder '{}' failed: {}", folder.path, reason);
        FolderOutcome::Failed {
            folder: folder.path.clone(),
            reason,
        }
    };

    match folder.copy_method {
        CopyMethod::Pubsync => {
            let rules = match EffectiveRules::merge(folder, profile) {
                Ok(rules) => rules,
                Err(e) => return failed(format!("invalid rule expression: {e}")),
            };
            let engine = SyncEngine::new(&rules, options.sync).with_max_depth(folder.levels);
            match engine.sync_folder(&source, &dest) {
                Ok(report) => FolderOutcome::Synced {
                    folder: name,
                    report,
                },
                Err(e) => failed(e.to_string()),
            }
        }
        CopyMethod::Mirror => {
            if !source.exists() {
                return failed(format!("source folder {} does not exist", source.display()));
            }
            match run_mirror(
                options.mirror_tool,
                &source,
                &dest,
                folder,
                options.sync.no_delete,
                options.sync.sync_files,
            ) {
                Ok(report) => FolderOutcome::Mirrored {
                    folder: name,
                    report,
                },
                Err(e) => failed(e.to_string()),
            }
        }
    }
}
