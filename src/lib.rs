//! PubSync: lightweight publish profiles for project trees
//!
//! Makes a destination folder match a source folder with the fewest copies
//! and deletes, subject to per-folder and per-profile exclusion and renaming
//! rules.
//!
//! # Architecture
//!
//! A sync run scans both roots into flat [`Snapshot`]s keyed by lowercase
//! relative path, maps every source key through the [`ReplacementChain`],
//! classifies each file by size and modification time, and applies the
//! resulting copies and deletes. Per-file failures are counted in the
//! [`FolderReport`] and never abort the folder.
//!
//! # Example
//!
//! ```no_run
//! use pubsync::{EffectiveRules, SyncEngine, SyncOptions};
//! use std::path::Path;
//!
//! let rules = EffectiveRules::default();
//! let engine = SyncEngine::new(&rules, SyncOptions::default());
//! match engine.sync_folder(Path::new("site"), Path::new("/srv/www/site")) {
//!     Ok(report) => println!("{} new, {} changed", report.new, report.changed),
//!     Err(e) => eprintln!("Sync failed: {}", e),
//! }
//! ```

pub mod config;
pub mod copy;
pub mod engine;
pub mod file_sync;
pub mod guard;
pub mod logging;
pub mod mirror;
pub mod publish;
pub mod rules;
pub mod scanner;

// Re-exports
pub use config::{
    load_from_path, load_from_str, ConfigError, CopyMethod, FolderEntry, Profile, PublishConfig,
    ValidationError,
};
pub use engine::{FileFailure, FileOutcome, FolderReport, SyncEngine, SyncError, SyncOptions};
pub use file_sync::{sync_file, FileSyncError, FileSyncOutcome, FileSyncStatus};
pub use guard::{GuardError, RootGuard};
pub use mirror::{MirrorError, MirrorReport, MirrorTool};
pub use publish::{publish, FolderOutcome, PublishError, PublishOptions, RunReport};
pub use rules::{
    EffectiveRules, ExclusionRule, ExclusionRuleSet, Location, ReplacementChain, ReplacementRule,
    RuleKind,
};
pub use scanner::{FileEntry, ScanError, ScanIssue, Snapshot, TreeScanner};
