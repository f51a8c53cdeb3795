//! pvmerge core library.
//!
//! This crate finds song declarations that collide between independently
//! authored mod packages and disables the losing ones: manifest discovery
//! and parsing, catalog assembly, conflict detection, priority-based
//! resolution planning, and backup-protected manifest patching.

pub mod backup;
pub mod catalog;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod multimap;
pub mod pipeline;
pub mod policy;
pub mod priority;
pub mod report;

// Re-exports for convenience.
pub use backup::{restore_backup, BackupStore};
pub use catalog::Catalog;
pub use config::AppConfig;
pub use conflict::{apply_resolution_plans, plan_resolutions, ConflictDetector, ResolutionPlanner};
pub use errors::CoreError;
pub use models::{CatalogEntry, ConflictGroup, RemovalPlan};
pub use pipeline::{MergeEngine, ResolveOptions};
pub use report::ConflictReport;
