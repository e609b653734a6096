pub mod loader;
pub mod schema;

pub use loader::{
    config_path, load_from_path, load_from_str, ConfigError, DEFAULT_CONFIG_FILE,
};
pub use schema::{
    CopyMethod, ExcludeDef, FolderEntry, Profile, PublishConfig, ReplaceDef, ValidationError,
    ValidationIssue,
};
