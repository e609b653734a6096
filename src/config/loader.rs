//! Reading the publish config from disk.
//!
//! Validation reports every issue at once, not just the first. Relative
//! publishing paths are anchored at the directory holding the config file,
//! so a config keeps working when `pubsync` runs from another directory.

use crate::config::schema::{PublishConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working root.
pub const DEFAULT_CONFIG_FILE: &str = "pubsync.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read publish config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: malformed TOML: {source}", origin(.path))]
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },

    #[error("{}: invalid publish config:\n{source}", origin(.path))]
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<inline>".to_string(),
    }
}

/// The config file to read: `explicit` when given, else
/// [`DEFAULT_CONFIG_FILE`] in `root`.
pub fn config_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => root.join(DEFAULT_CONFIG_FILE),
    }
}

fn parse(input: &str, origin: Option<&Path>) -> Result<PublishConfig, ConfigError> {
    let path = || origin.map(Path::to_path_buf);
    let config: PublishConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: path(), source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: path(), source })?;
    Ok(config)
}

/// Parse and validate a config held in memory. Publishing paths are kept
/// exactly as written.
pub fn load_from_str(input: &str) -> Result<PublishConfig, ConfigError> {
    parse(input, None)
}

/// Read, parse and validate the config at `path`, then resolve relative
/// publishing paths against the file's directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PublishConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse(&contents, Some(path))?;
    if let Some(dir) = path.parent() {
        config.resolve_publishing_paths(dir);
    }
    Ok(config)
}
