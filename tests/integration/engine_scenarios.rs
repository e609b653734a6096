//! Folder sync scenarios driven through `SyncEngine` on real temp trees.

use filetime::FileTime;
use pubsync::{
    EffectiveRules, ExclusionRule, ExclusionRuleSet, Location, ReplacementChain, ReplacementRule,
    RuleKind, SyncEngine, SyncOptions,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const STAMP: i64 = 1_700_000_000;

fn write(root: &Path, rel: &str, contents: &str, mtime: i64) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

fn mtime(path: &Path) -> i64 {
    FileTime::from_last_modification_time(&fs::metadata(path).unwrap()).unix_seconds()
}

fn trees() -> (TempDir, TempDir) {
    (TempDir::new().unwrap(), TempDir::new().unwrap())
}

fn exclusions(rules: Vec<ExclusionRule>) -> EffectiveRules {
    EffectiveRules {
        exclusions: ExclusionRuleSet::new(rules),
        replacements: ReplacementChain::default(),
    }
}

#[test]
fn test_first_run_copies_second_run_skips() {
    let (src, dst) = trees();
    write(src.path(), "a.txt", "alpha", STAMP);
    write(src.path(), "sub/b.txt", "beta", STAMP);

    let rules = EffectiveRules::default();
    let engine = SyncEngine::new(&rules, SyncOptions::default());

    let first = engine.sync_folder(src.path(), dst.path()).unwrap();
    assert_eq!(first.new, 2);
    assert_eq!(first.unchanged, 0);
    assert!(first.is_success());
    assert_eq!(fs::read_to_string(dst.path().join("sub/b.txt")).unwrap(), "beta");
    assert_eq!(mtime(&dst.path().join("a.txt")), STAMP);

    let second = engine.sync_folder(src.path(), dst.path()).unwrap();
    assert_eq!(second.unchanged, 2);
    assert_eq!(second.new + second.changed + second.deleted, 0);
}

#[test]
fn test_destination_root_is_created() {
    let (src, dst) = trees();
    write(src.path(), "a.txt", "a", STAMP);
    let dest_root = dst.path().join("deep/publish");

    let rules = EffectiveRules::default();
    let report = SyncEngine::new(&rules, SyncOptions::default())
        .sync_folder(src.path(), &dest_root)
        .unwrap();

    assert_eq!(report.new, 1);
    assert!(dest_root.join("a.txt").is_file());
}

#[test]
fn test_orphans_deleted_unless_no_delete() {
    let (src, dst) = trees();
    write(src.path(), "keep.txt", "k", STAMP);
    write(dst.path(), "keep.txt", "k", STAMP);
    write(dst.path(), "old/orphan.txt", "o", STAMP);

    let rules = EffectiveRules::default();

    let additive = SyncEngine::new(&rules, SyncOptions::additive())
        .sync_folder(src.path(), dst.path())
        .unwrap();
    assert_eq!(additive.deleted, 0);
    assert!(dst.path().join("old/orphan.txt").exists());

    let mirror = SyncEngine::new(&rules, SyncOptions::default())
        .sync_folder(src.path(), dst.path())
        .unwrap();
    assert_eq!(mirror.deleted, 1);
    assert_eq!(mirror.unchanged, 1);
    assert!(!dst.path().join("old/orphan.txt").exists());
}

#[test]
fn test_dry_run_reports_without_mutating() {
    let (src, dst) = trees();
    write(src.path(), "new.txt", "n", STAMP);
    write(src.path(), "changed.txt", "v2", STAMP + 5);
    write(dst.path(), "changed.txt", "v1", STAMP);
    write(dst.path(), "orphan.txt", "o", STAMP);

    let rules = EffectiveRules::default();
    let report = SyncEngine::new(&rules, SyncOptions::dry_run())
        .sync_folder(src.path(), dst.path())
        .unwrap();

    assert_eq!(report.new, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.deleted, 0);
    assert!(!dst.path().join("new.txt").exists());
    assert!(dst.path().join("orphan.txt").exists());
    assert_eq!(fs::read_to_string(dst.path().join("changed.txt")).unwrap(), "v1");
}

#[test]
fn test_excluded_folder_is_pruned_on_both_sides() {
    let (src, dst) = trees();
    write(src.path(), "bin/app.dll", "app", STAMP);
    write(src.path(), "obj/debug/app.obj", "junk", STAMP);
    write(dst.path(), "obj/stale.obj", "stale", STAMP);

    let rules = exclusions(vec![ExclusionRule::new(r"[/\\]obj$")
        .unwrap()
        .with_kind(RuleKind::Folder)]);
    let report = SyncEngine::new(&rules, SyncOptions::default())
        .sync_folder(src.path(), dst.path())
        .unwrap();

    assert_eq!(report.new, 1);
    assert_eq!(report.deleted, 0);
    assert!(dst.path().join("bin/app.dll").exists());
    assert!(!dst.path().join("obj/debug").exists());
    assert!(dst.path().join("obj/stale.obj").exists());
}

#[test]
fn test_inverted_rule_keeps_only_matching_files() {
    let (src, dst) = trees();
    write(src.path(), "app.dll", "dll", STAMP);
    write(src.path(), "app.pdb", "pdb", STAMP);
    write(src.path(), "readme.md", "md", STAMP);

    let rules = exclusions(vec![ExclusionRule::new(r"\.dll$")
        .unwrap()
        .with_kind(RuleKind::File)
        .with_location(Location::Source)
        .inverted(true)]);
    let report = SyncEngine::new(&rules, SyncOptions::default())
        .sync_folder(src.path(), dst.path())
        .unwrap();

    assert_eq!(report.new, 1);
    assert!(dst.path().join("app.dll").exists());
    assert!(!dst.path().join("app.pdb").exists());
}

#[test]
fn test_replacement_renames_and_stays_idempotent() {
    let (src, dst) = trees();
    write(src.path(), "Web.config", "<configuration/>", STAMP);
    write(dst.path(), "web.config", "stale", STAMP);

    let rules = EffectiveRules {
        exclusions: ExclusionRuleSet::default(),
        replacements: ReplacementChain::new(vec![
            ReplacementRule::new(r"\.config$", ".cfg").unwrap()
        ]),
    };
    let engine = SyncEngine::new(&rules, SyncOptions::default());

    let first = engine.sync_folder(src.path(), dst.path()).unwrap();
    assert_eq!(first.new, 1);
    assert_eq!(first.deleted, 1);
    assert_eq!(
        fs::read_to_string(dst.path().join("Web.cfg")).unwrap(),
        "<configuration/>"
    );
    assert!(!dst.path().join("web.config").exists());

    let second = engine.sync_folder(src.path(), dst.path()).unwrap();
    assert_eq!(second.unchanged, 1);
    assert_eq!(second.new + second.changed + second.deleted, 0);
}

#[test]
fn test_keys_match_case_insensitively() {
    let (src, dst) = trees();
    write(src.path(), "Docs/ReadMe.txt", "same", STAMP);
    write(dst.path(), "docs/README.TXT", "same", STAMP);

    let rules = EffectiveRules::default();
    let report = SyncEngine::new(&rules, SyncOptions::default())
        .sync_folder(src.path(), dst.path())
        .unwrap();

    assert_eq!(report.unchanged, 1);
    assert_eq!(report.new + report.deleted, 0);
    assert!(dst.path().join("docs/README.TXT").exists());
}

#[test]
fn test_subsecond_mtime_difference_is_ignored() {
    let (src, dst) = trees();
    let a = src.path().join("a.bin");
    let b = dst.path().join("a.bin");
    fs::write(&a, "1234").unwrap();
    fs::write(&b, "1234").unwrap();
    filetime::set_file_mtime(&a, FileTime::from_unix_time(STAMP, 900_000_000)).unwrap();
    filetime::set_file_mtime(&b, FileTime::from_unix_time(STAMP, 0)).unwrap();

    let rules = EffectiveRules::default();
    let report = SyncEngine::new(&rules, SyncOptions::default())
        .sync_folder(src.path(), dst.path())
        .unwrap();

    assert_eq!(report.unchanged, 1);
    assert_eq!(report.changed, 0);
}

#[test]
fn test_levels_limit_recursion() {
    let (src, dst) = trees();
    write(src.path(), "top.txt", "t", STAMP);
    write(src.path(), "nested/deep.txt", "d", STAMP);

    let rules = EffectiveRules::default();
    let report = SyncEngine::new(&rules, SyncOptions::default())
        .with_max_depth(Some(1))
        .sync_folder(src.path(), dst.path())
        .unwrap();

    assert_eq!(report.new, 1);
    assert!(dst.path().join("top.txt").exists());
    assert!(!dst.path().join("nested").exists());
}

#[test]
fn test_copy_failure_is_counted_and_others_still_sync() {
    let (src, dst) = trees();
    write(src.path(), "a.txt", "a", STAMP);
    write(src.path(), "b.txt", "b", STAMP);
    // a directory occupies the path a.txt must be written to
    fs::create_dir_all(dst.path().join("a.txt")).unwrap();

    let rules = EffectiveRules::default();
    let report = SyncEngine::new(&rules, SyncOptions::default())
        .sync_folder(src.path(), dst.path())
        .unwrap();

    assert_eq!(report.new, 1);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.errors[0].path, "a.txt");
    assert!(report.errors[0].message.contains("Failed to copy"));
    assert!(!report.is_success());
    assert_eq!(fs::read_to_string(dst.path().join("b.txt")).unwrap(), "b");
}

#[test]
#[cfg(unix)]
fn test_delete_failure_is_counted_and_others_still_sync() {
    use std::os::unix::fs::PermissionsExt;

    let (src, dst) = trees();
    write(src.path(), "fresh.txt", "f", STAMP);
    write(dst.path(), "locked/orphan.txt", "o", STAMP);
    write(dst.path(), "loose.txt", "l", STAMP);

    let locked = dst.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
    // privileged users ignore directory permissions
    if fs::write(locked.join("write-check"), "").is_ok() {
        fs::remove_file(locked.join("write-check")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let rules = EffectiveRules::default();
    let report = SyncEngine::new(&rules, SyncOptions::default())
        .sync_folder(src.path(), dst.path())
        .unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.new, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.errors[0].path, "locked/orphan.txt");
    assert!(report.errors[0].message.contains("Failed to delete"));
    assert!(!report.is_success());
    assert!(dst.path().join("locked/orphan.txt").exists());
    assert!(!dst.path().join("loose.txt").exists());
    assert!(dst.path().join("fresh.txt").exists());
}
