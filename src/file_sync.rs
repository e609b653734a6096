//! Publish a single file under a profile.
//!
//! The destination is the publishing path joined with the file's path
//! relative to the working root. Lookup is case-insensitive per path level,
//! the same way folder sync matches keys, so a copy published by a folder
//! sync is updated in place; anything missing takes the source's casing. No
//! exclusion or replacement rules apply.

use crate::config::PublishConfig;
use crate::copy::copy_preserving_mtime;
use crate::engine::SyncOptions;
use crate::guard::{GuardError, RootGuard};
use crate::scanner::FileEntry;
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum FileSyncError {
    #[error("Profile '{0}' does not exist")]
    UnknownProfile(String),

    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("{path} is not under the working root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Cannot resolve working root or source: {0}")]
    Resolve(#[source] GuardError),

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read metadata of {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<GuardError> for FileSyncError {
    fn from(error: GuardError) -> Self {
        match error {
            GuardError::OutsideRoot { path, root } => FileSyncError::OutsideRoot { path, root },
            other => FileSyncError::Resolve(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSyncStatus {
    /// Size and modification time already match.
    Identical,
    Updated,
    /// Differs, but this is a dry run.
    WouldUpdate,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSyncOutcome {
    /// Root-relative path, `/`-separated, source casing
    pub relative: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: FileSyncStatus,
}

/// Copy `file` to the profile's publishing path if its size or modification
/// time differs from the published copy.
pub fn sync_file(
    config: &PublishConfig,
    profile_name: &str,
    root: &Path,
    file: &Path,
    options: SyncOptions,
) -> Result<FileSyncOutcome, FileSyncError> {
    let profile = config
        .profile(profile_name)
        .ok_or_else(|| FileSyncError::UnknownProfile(profile_name.to_string()))?;
    info!("Publishing path: {}", profile.publishing_path);

    let source = if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    };
    if !source.is_file() {
        return Err(FileSyncError::SourceMissing(source));
    }

    let guard = RootGuard::new(root)?;
    let relative = guard
        .relative_path(&source)?
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>();
    let destination = resolve_destination(Path::new(&profile.publishing_path), &relative);
    let relative = relative.join("/");
    debug!("File: {} -> {}", relative, destination.display());

    let source_entry = entry_for(&source, &relative)?;
    let identical = match fs::metadata(&destination) {
        Ok(meta) if meta.is_file() => source_entry.is_same_as(&FileEntry::from_metadata(
            &destination,
            relative.as_str(),
            &meta,
        )),
        _ => false,
    };

    let status = if identical {
        FileSyncStatus::Identical
    } else if !options.sync_files {
        FileSyncStatus::WouldUpdate
    } else {
        copy_preserving_mtime(&source, &destination).map_err(|source_err| {
            FileSyncError::Copy {
                from: source.clone(),
                to: destination.clone(),
                source: source_err,
            }
        })?;
        FileSyncStatus::Updated
    };

    Ok(FileSyncOutcome {
        relative,
        source,
        destination,
        status,
    })
}

/// Walk `parts` below `base`, reusing whichever existing entry matches each
/// part case-insensitively. Parts with no existing match keep their casing.
fn resolve_destination(base: &Path, parts: &[String]) -> PathBuf {
    let mut current = base.to_path_buf();
    for part in parts {
        let name = existing_name(&current, part).unwrap_or_else(|| OsString::from(part));
        current.push(name);
    }
    current
}

/// Name of the entry in `dir` that folds to `part`. An exact match wins;
/// otherwise the first in name order, as scanning keeps it.
fn existing_name(dir: &Path, part: &str) -> Option<OsString> {
    if dir.join(part).exists() {
        return Some(OsString::from(part));
    }
    let wanted = part.to_lowercase();
    fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .filter(|name| name.to_string_lossy().to_lowercase() == wanted)
        .min()
}

fn entry_for(path: &Path, key: &str) -> Result<FileEntry, FileSyncError> {
    let meta = fs::metadata(path).map_err(|source| FileSyncError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FileEntry::from_metadata(path, key, &meta))
}
