//! Conflict detection, resolution planning and plan execution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Detection** -- grouping entries by id and by normalized title across
//!    package boundaries.
//! 2. **Planning** -- picking one winner per group by priority and turning the
//!    losers into per-package removal plans.
//! 3. **Execution** -- disabling the losing declarations in each manifest,
//!    with backups, exemptions and dry-run support.

pub mod detector;
pub mod executor;
pub mod planner;

pub use detector::{ConflictDetector, IdConflicts, TitleConflicts};
pub use executor::{
    apply_resolution_plans, disabled_ids, ExecutionReport, PackageOutcome, PackageReport,
};
pub use planner::{plan_resolutions, ResolutionPlanner};
