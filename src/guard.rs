use std::path::{Path, PathBuf};
use thiserror::Error;

/// Confirms that files handed to single-file sync live under the working root.
#[derive(Debug, Clone)]
pub struct RootGuard {
    /// Canonical path of the working root
    root: PathBuf,
}

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Path is not a descendant of the working root: {path} (root: {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl RootGuard {
    /// Create a guard for `root`, resolving symlinks.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, GuardError> {
        let root = canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    /// Resolve `path` (relative paths are taken from the root) and return it
    /// relative to the root.
    ///
    /// Symlinks are resolved first, so a link pointing outside is rejected.
    pub fn relative_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, GuardError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let canonical = canonicalize(&absolute)?;

        match canonical.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => Ok(relative.to_path_buf()),
            _ => Err(GuardError::OutsideRoot {
                path: canonical,
                root: self.root.clone(),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, GuardError> {
    path.canonicalize().map_err(|source| GuardError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}
