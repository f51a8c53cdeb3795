//! Applies removal plans to manifests on disk.
//!
//! Losing declarations are disabled by prefixing the line with
//! [`REMOVAL_MARKER`] after its indentation. Nothing is deleted, so a marked
//! manifest still diffs cleanly against its backup and a second run can tell
//! which lines it already handled.
//!
//! Packages are processed one at a time in name order. A failure while
//! handling one package is recorded in the [`ExecutionReport`] and the run
//! moves on to the next package.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::backup::BackupStore;
use crate::errors::ResolveError;
use crate::manifest::parser::{
    declaration_id, disabled_declaration_id, is_marked, REMOVAL_MARKER,
};
use crate::models::RemovalPlan;
use crate::policy::PackagePolicy;

/// Terminal state of one package in a run.
#[derive(Debug)]
pub enum PackageOutcome {
    /// Listed as exempt; never touched.
    Exempt,
    /// The manifest no longer exists.
    MissingFile,
    /// The plan had no ids.
    NoOp,
    /// Dry run: the ids that would have been disabled.
    DryRun { ids: Vec<u32> },
    Applied {
        /// Ids whose declarations were marked in this run.
        affected: Vec<u32>,
        /// Ids whose declarations already carried the marker.
        already_disabled: Vec<u32>,
        /// Requested ids with no declaration in the file.
        missing: Vec<u32>,
        backup: PathBuf,
        backup_created: bool,
        /// Whether the manifest was written.
        rewritten: bool,
    },
    Failed { error: ResolveError },
}

impl PackageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Exempt => "exempt",
            Self::MissingFile => "missing file",
            Self::NoOp => "nothing to do",
            Self::DryRun { .. } => "dry run",
            Self::Applied { .. } => "applied",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug)]
pub struct PackageReport {
    pub package: String,
    pub manifest_path: PathBuf,
    pub outcome: PackageOutcome,
}

/// Outcomes of one executor run, in processing order.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub packages: Vec<PackageReport>,
}

impl ExecutionReport {
    pub fn outcome(&self, package: &str) -> Option<&PackageOutcome> {
        self.packages
            .iter()
            .find(|p| p.package == package)
            .map(|p| &p.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PackageReport> {
        self.packages.iter().filter(|p| p.outcome.is_failure())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Packages whose manifest was actually rewritten.
    pub fn rewritten_count(&self) -> usize {
        self.packages
            .iter()
            .filter(|p| matches!(p.outcome, PackageOutcome::Applied { rewritten: true, .. }))
            .count()
    }

    /// Declarations disabled in this run, across all packages.
    pub fn disabled_count(&self) -> usize {
        self.packages
            .iter()
            .map(|p| match &p.outcome {
                PackageOutcome::Applied { affected, .. } => affected.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Apply every plan, in package-name order.
///
/// Packages exempted by `policy` are never touched. With `dry_run` set no
/// file is created, written or copied.
pub fn apply_resolution_plans(
    plans: &BTreeMap<String, RemovalPlan>,
    backup_dir: &Path,
    dry_run: bool,
    policy: &PackagePolicy,
) -> ExecutionReport {
    let store = BackupStore::new(backup_dir);
    let mut report = ExecutionReport {
        dry_run,
        packages: Vec::with_capacity(plans.len()),
    };

    for plan in plans.values() {
        let outcome = execute_plan(plan, &store, dry_run, policy);
        log_outcome(&plan.package_name, &outcome);
        report.packages.push(PackageReport {
            package: plan.package_name.clone(),
            manifest_path: plan.manifest_path.clone(),
            outcome,
        });
    }

    info!(
        packages = report.packages.len(),
        rewritten = report.rewritten_count(),
        disabled = report.disabled_count(),
        failed = report.failed_count(),
        dry_run,
        "resolution finished"
    );
    report
}

fn execute_plan(
    plan: &RemovalPlan,
    store: &BackupStore,
    dry_run: bool,
    policy: &PackagePolicy,
) -> PackageOutcome {
    if policy.is_exempt(&plan.package_name) {
        return PackageOutcome::Exempt;
    }
    if !plan.manifest_path.exists() {
        return PackageOutcome::MissingFile;
    }
    if plan.is_empty() {
        return PackageOutcome::NoOp;
    }
    if dry_run {
        return PackageOutcome::DryRun {
            ids: plan.ids_to_remove().to_vec(),
        };
    }
    match apply_plan(plan, store) {
        Ok(outcome) => outcome,
        Err(error) => PackageOutcome::Failed { error },
    }
}

fn apply_plan(plan: &RemovalPlan, store: &BackupStore) -> Result<PackageOutcome, ResolveError> {
    let path = plan.manifest_path();
    let backup = store
        .create(&plan.package_name, path)
        .map_err(|source| ResolveError::Backup {
            package: plan.package_name.clone(),
            source,
        })?;

    let original = std::fs::read(path).map_err(|source| ResolveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let patch = disable_declarations(&original, plan.ids_to_remove());

    let rewritten = !patch.affected.is_empty();
    if rewritten {
        write_atomically(path, &patch.contents)?;
    }

    let missing = plan
        .ids_to_remove()
        .iter()
        .copied()
        .filter(|id| !patch.affected.contains(id) && !patch.already_disabled.contains(id))
        .collect();

    Ok(PackageOutcome::Applied {
        affected: patch.affected,
        already_disabled: patch.already_disabled,
        missing,
        backup: backup.path,
        backup_created: backup.created,
        rewritten,
    })
}

struct Patch {
    contents: Vec<u8>,
    affected: Vec<u32>,
    already_disabled: Vec<u32>,
}

/// Mark every declaration line whose id is in `ids`.
///
/// Works on raw bytes line by line so untouched lines, line endings and
/// non-UTF-8 content come through unchanged.
fn disable_declarations(original: &[u8], ids: &[u32]) -> Patch {
    let targets: HashSet<u32> = ids.iter().copied().collect();
    let mut patch = Patch {
        contents: Vec::with_capacity(original.len() + 64),
        affected: Vec::new(),
        already_disabled: Vec::new(),
    };

    for line in original.split_inclusive(|&b| b == b'\n') {
        let text = String::from_utf8_lossy(line);
        if is_marked(&text) {
            if let Some(id) = disabled_declaration_id(&text) {
                if targets.contains(&id) {
                    push_unique(&mut patch.already_disabled, id);
                }
            }
            patch.contents.extend_from_slice(line);
            continue;
        }

        match declaration_id(&text) {
            Some(id) if targets.contains(&id) => {
                let indent = line
                    .iter()
                    .take_while(|&&b| b == b' ' || b == b'\t')
                    .count();
                patch.contents.extend_from_slice(&line[..indent]);
                patch.contents.extend_from_slice(REMOVAL_MARKER.as_bytes());
                patch.contents.extend_from_slice(&line[indent..]);
                push_unique(&mut patch.affected, id);
            }
            _ => patch.contents.extend_from_slice(line),
        }
    }
    patch
}

fn push_unique(ids: &mut Vec<u32>, id: u32) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

/// Ids whose declarations carry the removal marker, in first-seen order.
pub fn disabled_ids(text: &str) -> Vec<u32> {
    let mut ids = Vec::new();
    for id in text.lines().filter_map(disabled_declaration_id) {
        push_unique(&mut ids, id);
    }
    ids
}

/// Replace `path` with `contents` through a temporary file in the same
/// directory, keeping the original permissions.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), ResolveError> {
    let write_error = |source: std::io::Error| ResolveError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(contents).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    let permissions = std::fs::metadata(path).map_err(write_error)?.permissions();
    tmp.as_file().set_permissions(permissions).map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

fn log_outcome(package: &str, outcome: &PackageOutcome) {
    match outcome {
        PackageOutcome::Exempt => info!(package, "package is exempt, skipped"),
        PackageOutcome::MissingFile => warn!(package, "manifest no longer exists, skipped"),
        PackageOutcome::NoOp => info!(package, "nothing to remove"),
        PackageOutcome::DryRun { ids } => {
            info!(package, count = ids.len(), ids = ?ids, "dry run: would disable")
        }
        PackageOutcome::Applied {
            affected,
            already_disabled,
            missing,
            rewritten,
            ..
        } => {
            info!(
                package,
                affected = affected.len(),
                already_disabled = already_disabled.len(),
                rewritten = *rewritten,
                "declarations disabled"
            );
            if !missing.is_empty() {
                warn!(package, ids = ?missing, "ids from the plan were not found in the manifest");
            }
        }
        PackageOutcome::Failed { error } => error!(package, error = %error, "resolution failed"),
    }
}
