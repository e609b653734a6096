//! Profile runs loaded from a config file on disk.

use filetime::FileTime;
use pubsync::config::{load_from_path, ConfigError};
use pubsync::{
    publish, sync_file, FileSyncError, FileSyncStatus, FolderOutcome, PublishOptions,
    SyncOptions,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("site/css")).unwrap();
    fs::create_dir_all(dir.path().join("site/.git")).unwrap();
    fs::create_dir_all(dir.path().join("bin")).unwrap();

    fs::write(dir.path().join("site/index.html"), "<html/>").unwrap();
    fs::write(dir.path().join("site/css/main.css"), "body{}").unwrap();
    fs::write(dir.path().join("site/.git/HEAD"), "ref").unwrap();
    fs::write(dir.path().join("site/web.live.config"), "live").unwrap();
    fs::write(dir.path().join("bin/tool.exe"), "exe").unwrap();
    fs::write(dir.path().join("bin/tool.pdb"), "pdb").unwrap();
    dir
}

fn write_config(project: &Path, publishing: &Path) -> std::path::PathBuf {
    let config = format!(
        r#"
[[profiles]]
name = "live"
publishing_path = '{}'

[[profiles.exclude]]
expression = '[/\\]\.git$'
type = "folder"

[[profiles.replace]]
expression = '\.live\.config$'
replacement = ".config"

[[folders]]
path = "site"

[[folders]]
path = "bin"

[[folders.exclude]]
expression = '\.pdb$'
type = "file"
location = "source"

[[folders]]
path = "docs"
"#,
        publishing.display()
    );
    let path = project.join("pubsync.toml");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_profile_run_applies_merged_rules() {
    let project = setup_project();
    let publishing = TempDir::new().unwrap();
    let config_path = write_config(project.path(), publishing.path());

    let config = load_from_path(&config_path).unwrap();
    let run = publish(&config, "live", project.path(), PublishOptions::default()).unwrap();

    assert!(run.is_success());
    assert_eq!(run.folders.len(), 3);
    let out = publishing.path();
    assert!(out.join("site/index.html").is_file());
    assert!(out.join("site/css/main.css").is_file());
    assert!(!out.join("site/.git").exists());
    assert_eq!(fs::read_to_string(out.join("site/web.config")).unwrap(), "live");
    assert!(out.join("bin/tool.exe").is_file());
    assert!(!out.join("bin/tool.pdb").exists());

    match &run.folders[2] {
        FolderOutcome::Synced { report, .. } => assert!(report.source_missing),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_second_run_changes_nothing() {
    let project = setup_project();
    let publishing = TempDir::new().unwrap();
    let config_path = write_config(project.path(), publishing.path());
    let config = load_from_path(&config_path).unwrap();

    publish(&config, "live", project.path(), PublishOptions::default()).unwrap();
    let run = publish(&config, "live", project.path(), PublishOptions::default()).unwrap();

    for outcome in &run.folders {
        if let FolderOutcome::Synced { report, .. } = outcome {
            assert_eq!(report.new + report.changed + report.deleted, 0);
        }
    }
}

#[test]
fn test_run_report_serializes() {
    let project = setup_project();
    let publishing = TempDir::new().unwrap();
    let config_path = write_config(project.path(), publishing.path());
    let config = load_from_path(&config_path).unwrap();

    let options = PublishOptions {
        sync: SyncOptions::dry_run(),
        ..PublishOptions::default()
    };
    let run = publish(&config, "live", project.path(), options).unwrap();
    let json = serde_json::to_value(&run).unwrap();

    assert_eq!(json["profile"], "live");
    assert_eq!(json["folders"][0]["kind"], "synced");
    assert_eq!(json["folders"][0]["report"]["new"], 3);
    assert_eq!(json["folders"][0]["report"]["dry_run"], true);
    assert!(!publishing.path().join("site").exists());
}

#[test]
fn test_single_file_publish() {
    let project = setup_project();
    let publishing = TempDir::new().unwrap();
    let config_path = write_config(project.path(), publishing.path());
    let config = load_from_path(&config_path).unwrap();

    let outcome = sync_file(
        &config,
        "live",
        project.path(),
        Path::new("site/css/main.css"),
        SyncOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.status, FileSyncStatus::Updated);
    assert!(publishing.path().join("site/css/main.css").is_file());

    let outside = TempDir::new().unwrap();
    let stray = outside.path().join("stray.txt");
    fs::write(&stray, "x").unwrap();
    let err = sync_file(&config, "live", project.path(), &stray, SyncOptions::default())
        .unwrap_err();
    assert!(matches!(err, FileSyncError::OutsideRoot { .. }));
}

#[test]
fn test_single_file_then_folder_sync_agree_on_casing() {
    let project = setup_project();
    let publishing = TempDir::new().unwrap();
    let config_path = write_config(project.path(), publishing.path());
    let config = load_from_path(&config_path).unwrap();

    let theme = project.path().join("site/Styles/Theme.css");
    fs::create_dir_all(theme.parent().unwrap()).unwrap();
    fs::write(&theme, "v1").unwrap();
    filetime::set_file_mtime(&theme, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let first = publish(&config, "live", project.path(), PublishOptions::default()).unwrap();
    assert!(first.is_success());

    fs::write(&theme, "v2!").unwrap();
    filetime::set_file_mtime(&theme, FileTime::from_unix_time(1_700_000_100, 0)).unwrap();
    let outcome = sync_file(
        &config,
        "live",
        project.path(),
        Path::new("site/Styles/Theme.css"),
        SyncOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.status, FileSyncStatus::Updated);

    let second = publish(&config, "live", project.path(), PublishOptions::default()).unwrap();
    assert!(second.is_success(), "{:?}", second.folders);
    match &second.folders[0] {
        FolderOutcome::Synced { report, .. } => {
            assert_eq!(report.new + report.changed + report.deleted, 0);
            assert_eq!(report.error_count(), 0);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    let published: Vec<_> = fs::read_dir(publishing.path().join("site/Styles"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(published, vec!["Theme.css".to_string()]);
    assert_eq!(
        fs::read_to_string(publishing.path().join("site/Styles/Theme.css")).unwrap(),
        "v2!"
    );
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pubsync.toml");
    fs::write(
        &path,
        r#"
[[profiles]]
name = "live"
publishing_path = "/srv"

[[folders]]
path = "../outside"

[[folders.exclude]]
expression = "(unclosed"
type = "file"
"#,
    )
    .unwrap();

    let err = load_from_path(&path).unwrap_err();
    match err {
        ConfigError::Validation { source, .. } => assert_eq!(source.issues.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}
