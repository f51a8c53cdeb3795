//! End-to-end merge runs.
//!
//! The [`MergeEngine`] drives one run through its stages:
//!
//! 1. Load the priority order and check the discovered manifests.
//! 2. Optionally restore every manifest from backup.
//! 3. Discover manifests under the mods directory.
//! 4. Assemble the catalog (ignore patterns, priorities).
//! 5. Detect id and title conflicts.
//! 6. Pick winners and build per-package removal plans.
//! 7. Apply the plans (or report them on a dry run).
//!
//! Configuration and catalog problems abort the run before any manifest is
//! touched. Failures while applying a single package's plan are collected in
//! the [`ExecutionReport`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::backup::BackupStore;
use crate::catalog::{select_manifests, Catalog};
use crate::config::AppConfig;
use crate::conflict::{
    apply_resolution_plans, plan_resolutions, ConflictDetector, ExecutionReport, IdConflicts,
    ResolutionPlanner, TitleConflicts,
};
use crate::errors::CoreError;
use crate::manifest::discover_manifests;
use crate::models::{ConflictGroup, RemovalPlan};
use crate::priority::PriorityTable;
use crate::report::ConflictReport;

/// Everything detection and planning produced.
#[derive(Debug)]
pub struct ScanOutcome {
    pub catalog: Catalog,
    pub id_conflicts: IdConflicts,
    pub title_conflicts: TitleConflicts,
    /// Id groups first, then title groups.
    pub groups: Vec<ConflictGroup>,
    /// Keyed by package name.
    pub plans: BTreeMap<String, RemovalPlan>,
}

impl ScanOutcome {
    pub fn has_conflicts(&self) -> bool {
        !self.groups.is_empty()
    }

    pub fn report(&self) -> ConflictReport {
        ConflictReport::build(&self.catalog, &self.groups, &self.plans)
    }
}

/// Options for [`MergeEngine::resolve`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Report plans without touching any file. Also enabled by
    /// `resolution.dry_run` in the config.
    pub dry_run: bool,
    /// Restore every manifest from backup before scanning.
    pub restore_first: bool,
}

/// Packages handled by a bulk restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: Vec<String>,
    /// Packages with no backup, left as they were.
    pub without_backup: Vec<String>,
}

#[derive(Debug)]
pub struct ResolveOutcome {
    /// Set when the run started with a restore.
    pub restore: Option<RestoreSummary>,
    pub scan: ScanOutcome,
    pub execution: ExecutionReport,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Runs scans, resolutions and restores for one configuration.
pub struct MergeEngine {
    config: AppConfig,
}

impl MergeEngine {
    pub fn new(config: AppConfig) -> Self {
        info!(mods_dir = %config.mods_dir().display(), "initializing merge engine");
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Discover, assemble, detect and plan. Never writes.
    pub fn scan(&self) -> Result<ScanOutcome, CoreError> {
        let priorities = self.config.priority_table()?;
        self.scan_with(&priorities)
    }

    fn scan_with(&self, priorities: &PriorityTable) -> Result<ScanOutcome, CoreError> {
        let mods_dir = self.config.mods_dir();
        let manifests = discover_manifests(&mods_dir, &self.config.manifest_layout())?;
        if manifests.is_empty() {
            warn!(mods_dir = %mods_dir.display(), "no manifests found");
        }

        let default_priority = self.config.priority.default_priority;
        let catalog = Catalog::assemble(
            &manifests,
            priorities,
            default_priority,
            &self.config.package_policy(),
        )?;

        let id_conflicts = ConflictDetector::detect_id_conflicts(catalog.entries());
        let title_conflicts = ConflictDetector::detect_title_conflicts(catalog.entries());

        let planner = ResolutionPlanner::new(&catalog, default_priority);
        let groups = planner.build_conflict_records(&id_conflicts, &title_conflicts);
        let plans = plan_resolutions(&groups);

        info!(
            packages = catalog.len(),
            entries = catalog.entry_count(),
            id_conflicts = id_conflicts.len(),
            title_conflicts = title_conflicts.len(),
            plans = plans.len(),
            "scan complete"
        );
        Ok(ScanOutcome {
            catalog,
            id_conflicts,
            title_conflicts,
            groups,
            plans,
        })
    }

    /// Scan and apply the resulting plans.
    ///
    /// With `restore_first`, every manifest is restored before discovery so
    /// detection sees the pristine files. The priority order is loaded first,
    /// so a broken order aborts before any restore.
    pub fn resolve(&self, options: ResolveOptions) -> Result<ResolveOutcome, CoreError> {
        let started_at = Utc::now();
        let dry_run = options.dry_run || self.config.resolution.dry_run;
        let priorities = self.config.priority_table()?;

        let restore = if options.restore_first {
            if dry_run {
                warn!("restore requested on a dry run, skipping restore");
                None
            } else {
                Some(self.restore_all()?)
            }
        } else {
            None
        };

        let scan = self.scan_with(&priorities)?;
        let execution = apply_resolution_plans(
            &scan.plans,
            &self.config.backup_dir(),
            dry_run,
            &self.config.package_policy(),
        );

        Ok(ResolveOutcome {
            restore,
            scan,
            execution,
            started_at,
            completed_at: Utc::now(),
        })
    }

    /// Restore every discovered, non-ignored package from its backup.
    ///
    /// Packages without a backup are left alone. A package with more than
    /// one manifest aborts the restore before any file is written, since
    /// backups are kept per package. Any other failure aborts too.
    pub fn restore_all(&self) -> Result<RestoreSummary, CoreError> {
        let manifests =
            discover_manifests(&self.config.mods_dir(), &self.config.manifest_layout())?;
        let selection = select_manifests(&manifests, &self.config.package_policy())?;
        let store = BackupStore::new(self.config.backup_dir());

        let mut summary = RestoreSummary::default();
        for (package, manifest) in selection.selected {
            if store.restore(package, &manifest.path, true)? {
                summary.restored.push(package.to_string());
            } else {
                summary.without_backup.push(package.to_string());
            }
        }

        info!(
            restored = summary.restored.len(),
            without_backup = summary.without_backup.len(),
            "restore complete"
        );
        Ok(summary)
    }
}

/// Scan with `config`. See [`MergeEngine::scan`].
pub fn scan(config: &AppConfig) -> Result<ScanOutcome, CoreError> {
    MergeEngine::new(config.clone()).scan()
}

/// Resolve with `config`. See [`MergeEngine::resolve`].
pub fn resolve(config: &AppConfig, options: ResolveOptions) -> Result<ResolveOutcome, CoreError> {
    MergeEngine::new(config.clone()).resolve(options)
}

/// Restore every package with `config`. See [`MergeEngine::restore_all`].
pub fn restore_all(config: &AppConfig) -> Result<RestoreSummary, CoreError> {
    MergeEngine::new(config.clone()).restore_all()
}
