//! End-to-end tests for conflict resolution over real mods directories.
//!
//! Each test lays out a mods tree in a temp directory, writes a config next
//! to it and drives the [`MergeEngine`] the way the CLI does.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use pvmerge_core::conflict::{disabled_ids, PackageOutcome};
use pvmerge_core::errors::{CatalogError, CoreError};
use pvmerge_core::pipeline::{MergeEngine, ResolveOptions};
use pvmerge_core::{restore_backup, AppConfig};

// ===========================================================================
// Helpers
// ===========================================================================

struct ModsTree {
    dir: TempDir,
}

impl ModsTree {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn add(&self, package: &str, body: &str) -> PathBuf {
        let path = self
            .root()
            .join("mods")
            .join(package)
            .join("rom")
            .join("mod_pv_db.txt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    fn engine(&self, config_toml: &str) -> MergeEngine {
        let path = self.root().join("pvmerge.toml");
        std::fs::write(&path, config_toml).unwrap();
        MergeEngine::new(AppConfig::load_and_validate(&path).unwrap())
    }

    fn backups(&self) -> PathBuf {
        self.root().join("backups")
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

const CONFIG: &str = r#"
[catalog]
mods_dir = "mods"

[priority]
order = ["modA", "modB", "modC"]

[resolution]
backup_dir = "backups"
exempt = ["modC"]
"#;

const MOD_A: &str = "\
# 5 - Shared Five
pv_5.song_name=Five (A)
pv_5.song_name_en=Five
pv_10.song_name=Ten
pv_10.song_name_en=Dreamy Theater
";

const MOD_B: &str = "\
pv_5.song_name=Five (B)
pv_5.song_name_en=Something Else
pv_7.song_name=Seven
pv_20.song_name=Twenty
pv_20.song_name_en=dreamy  THEATER
";

const MOD_C: &str = "\
pv_5.song_name=Five (C)
pv_30.song_name=Thirty
";

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_resolve_disables_losers_and_keeps_winner() {
    let tree = ModsTree::new();
    let a = tree.add("modA", MOD_A);
    let b = tree.add("modB", MOD_B);
    let c = tree.add("modC", MOD_C);
    let engine = tree.engine(CONFIG);

    let outcome = engine.resolve(ResolveOptions::default()).unwrap();

    // modA wins everything it is involved in.
    assert_eq!(read(&a), MOD_A);
    // modC is exempt even though it lost id 5.
    assert_eq!(read(&c), MOD_C);
    assert!(matches!(
        outcome.execution.outcome("modC"),
        Some(PackageOutcome::Exempt)
    ));

    // modB lost id 5 (id conflict) and id 20 (title conflict).
    let patched = read(&b);
    assert_eq!(disabled_ids(&patched), vec![5, 20]);
    assert!(patched.contains("\npv_7.song_name=Seven\n"));
    assert!(outcome.execution.is_success());

    let backup = tree.backups().join("modB").join("mod_pv_db.txt.bak");
    assert_eq!(read(&backup), MOD_B);
}

#[test]
fn test_second_resolve_changes_nothing() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let b = tree.add("modB", MOD_B);
    let engine = tree.engine(CONFIG);

    engine.resolve(ResolveOptions::default()).unwrap();
    let after_first = read(&b);

    // The marked lines no longer parse as declarations, so the second scan
    // sees no conflict for modB at all.
    let second = engine.resolve(ResolveOptions::default()).unwrap();
    assert_eq!(read(&b), after_first);
    assert!(second.scan.plans.get("modB").is_none());
    assert_eq!(second.execution.rewritten_count(), 0);
}

#[test]
fn test_dry_run_writes_nothing() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let b = tree.add("modB", MOD_B);
    let engine = tree.engine(CONFIG);

    let outcome = engine
        .resolve(ResolveOptions {
            dry_run: true,
            restore_first: false,
        })
        .unwrap();

    assert_eq!(read(&b), MOD_B);
    assert!(!tree.backups().exists());
    match outcome.execution.outcome("modB") {
        Some(PackageOutcome::DryRun { ids }) => assert_eq!(ids, &[5, 20]),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_restore_first_rolls_back_before_scanning() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let b = tree.add("modB", MOD_B);
    let engine = tree.engine(CONFIG);
    engine.resolve(ResolveOptions::default()).unwrap();

    // Priorities flip: modB now outranks modA.
    let flipped = CONFIG.replace(
        r#"order = ["modA", "modB", "modC"]"#,
        r#"order = ["modB", "modA", "modC"]"#,
    );
    let engine = tree.engine(&flipped);
    let outcome = engine
        .resolve(ResolveOptions {
            dry_run: false,
            restore_first: true,
        })
        .unwrap();

    let restore = outcome.restore.expect("restore ran");
    assert_eq!(restore.restored, vec!["modB".to_string()]);
    assert_eq!(restore.without_backup, vec!["modA".to_string()]);
    assert_eq!(read(&b), MOD_B);
    assert!(outcome.scan.plans.contains_key("modA"));
    assert!(!outcome.scan.plans.contains_key("modB"));
}

#[test]
fn test_restore_backup_free_function() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let b = tree.add("modB", MOD_B);
    tree.engine(CONFIG)
        .resolve(ResolveOptions::default())
        .unwrap();
    assert_ne!(read(&b), MOD_B);

    assert!(restore_backup(&tree.backups(), "modB", &b, false).unwrap());
    assert_eq!(read(&b), MOD_B);
    assert!(!restore_backup(&tree.backups(), "modA", &tree.root().join("x"), true).unwrap());
}

#[test]
fn test_ignored_packages_are_invisible() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let b = tree.add("modB", MOD_B);
    let config = format!("{CONFIG}ignore = [\"modb\"]\n");
    let outcome = tree.engine(&config).resolve(ResolveOptions::default()).unwrap();

    assert!(outcome.scan.catalog.package("modB").is_none());
    assert_eq!(outcome.scan.catalog.ignored(), &["modB".to_string()]);
    assert!(!outcome.scan.has_conflicts());
    assert_eq!(read(&b), MOD_B);
}

#[test]
fn test_unlisted_packages_lose_to_listed_ones() {
    let tree = ModsTree::new();
    tree.add("modA", "pv_1.song_name=One\n");
    let stray = tree.add("aaa_stray", "pv_1.song_name=Uno\n");
    let outcome = tree.engine(CONFIG).resolve(ResolveOptions::default()).unwrap();

    assert_eq!(outcome.scan.groups[0].winner.owner_package, "modA");
    assert_eq!(disabled_ids(&read(&stray)), vec![1]);
}

#[test]
fn test_two_manifests_in_one_package_is_fatal() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let extra = tree.root().join("mods/modA/extra/rom/mod_pv_db.txt");
    std::fs::create_dir_all(extra.parent().unwrap()).unwrap();
    std::fs::write(&extra, "pv_99.song_name=x\n").unwrap();

    let result = tree.engine(CONFIG).scan();
    assert!(matches!(
        result,
        Err(CoreError::Catalog(CatalogError::DuplicatePackage { ref name, .. })) if name == "modA"
    ));
}

#[test]
fn test_scan_report_json() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    tree.add("modB", MOD_B);
    let outcome = tree.engine(CONFIG).scan().unwrap();
    let report = outcome.report();

    assert_eq!(report.id_conflict_count(), 1);
    assert_eq!(report.title_conflict_count(), 1);
    let json: serde_json::Value =
        serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["conflicts"][0]["kind"], "id_conflict");
    assert_eq!(json["conflicts"][0]["key"], 5);
    assert_eq!(json["conflicts"][1]["key"], "dreamy theater");
    assert_eq!(json["plans"][0]["package_name"], "modB");
}

#[test]
fn test_restore_refuses_package_with_two_manifests() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let b = tree.add("modB", MOD_B);
    let engine = tree.engine(CONFIG);
    engine.resolve(ResolveOptions::default()).unwrap();
    let patched = read(&b);

    let extra = tree.root().join("mods/modB/extra/rom/mod_pv_db.txt");
    std::fs::create_dir_all(extra.parent().unwrap()).unwrap();
    std::fs::write(&extra, "pv_77.song_name=Precious\n").unwrap();

    let result = engine.restore_all();
    assert!(matches!(
        result,
        Err(CoreError::Catalog(CatalogError::DuplicatePackage { ref name, .. })) if name == "modB"
    ));
    assert_eq!(read(&extra), "pv_77.song_name=Precious\n");
    assert_eq!(read(&b), patched);

    let result = engine.resolve(ResolveOptions {
        dry_run: false,
        restore_first: true,
    });
    assert!(result.is_err());
    assert_eq!(read(&extra), "pv_77.song_name=Precious\n");
    assert_eq!(read(&b), patched);
}

#[test]
fn test_bad_loader_config_aborts_before_restore() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let b = tree.add("modB", MOD_B);
    tree.engine(CONFIG)
        .resolve(ResolveOptions::default())
        .unwrap();
    let patched = read(&b);

    std::fs::write(tree.root().join("config.toml"), "priority = 3\n").unwrap();
    let config = CONFIG.replace(
        "mods_dir = \"mods\"\n",
        "mods_dir = \"mods\"\nloader_config = \"config.toml\"\n",
    );
    let result = tree.engine(&config).resolve(ResolveOptions {
        dry_run: false,
        restore_first: true,
    });

    assert!(matches!(result, Err(CoreError::Config(_))));
    assert_eq!(read(&b), patched);
}

#[test]
fn test_resolved_conflict_stays_resolved_despite_title_comment() {
    let tree = ModsTree::new();
    tree.add("modA", MOD_A);
    let b = tree.add("modB", &format!("# 5 - Five B\n{MOD_B}"));
    let engine = tree.engine(CONFIG);
    engine.resolve(ResolveOptions::default()).unwrap();
    assert!(read(&b).starts_with("# 5 - Five B\n#[pvmerge] pv_5.song_name=Five (B)\n"));

    let rescan = engine.scan().unwrap();
    assert!(!rescan.has_conflicts());
    let ids: Vec<u32> = rescan
        .catalog
        .package("modB")
        .unwrap()
        .entries
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![7]);
}
