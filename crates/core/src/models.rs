//! Domain model types used throughout pvmerge.
//!
//! Entries and packages are built once per run from manifest contents and are
//! read-only afterwards. Conflict groups and removal plans are derived,
//! in-memory values that only live for the duration of a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::PlanError;

// ---------------------------------------------------------------------------
// Catalog entry
// ---------------------------------------------------------------------------

/// Where an entry comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// The game's own catalog.
    Base,
    /// A mod package.
    Mod,
}

impl std::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Mod => write!(f, "mod"),
        }
    }
}

/// One declared catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Package-local key (`pv_<id>`).
    pub id: u32,
    /// Primary display title. Never empty.
    pub title: String,
    /// Secondary, localized title.
    pub title_en: Option<String>,
    /// Name of the package that declared the entry.
    pub owner_package: String,
    pub owner_kind: OwnerKind,
    /// Manifest the entry was declared in.
    pub origin_path: PathBuf,
}

impl CatalogEntry {
    /// Create a mod-owned entry.
    pub fn new(
        id: u32,
        title: impl Into<String>,
        title_en: Option<String>,
        owner_package: impl Into<String>,
        origin_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            title_en,
            owner_package: owner_package.into(),
            owner_kind: OwnerKind::Mod,
            origin_path: origin_path.into(),
        }
    }

    /// Localized title normalized for comparison; empty when there is none.
    ///
    /// Entries with an empty normalized title never take part in title
    /// conflicts.
    pub fn normalized_title(&self) -> String {
        self.title_en
            .as_deref()
            .map(normalize_title)
            .unwrap_or_default()
    }

    /// `"{owner_kind}:{owner_package}"`, the unit of provenance for conflicts.
    pub fn origin_label(&self) -> String {
        format!("{}:{}", self.owner_kind, self.owner_package)
    }

    /// Title to show in reports: the localized one when present.
    pub fn display_title(&self) -> &str {
        self.title_en.as_deref().unwrap_or(&self.title)
    }
}

/// Collapse whitespace runs to single spaces, trim, and lowercase.
pub fn normalize_title(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Package
// ---------------------------------------------------------------------------

/// Metadata and entries of one package.
///
/// Every entry's `owner_package` equals `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    /// Lower values win conflicts.
    pub priority: i64,
    pub root_path: PathBuf,
    pub manifest_path: PathBuf,
    pub entries: Vec<CatalogEntry>,
}

impl PackageInfo {
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// What the members of a conflict group share.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Same numeric id.
    #[serde(rename = "id_conflict")]
    Id,
    /// Same normalized localized title.
    #[serde(rename = "title_conflict")]
    Title,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id => write!(f, "id_conflict"),
            Self::Title => write!(f, "title_conflict"),
        }
    }
}

/// The grouping key of a conflict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum ConflictKey {
    Id(u32),
    Title(String),
}

impl std::fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Title(title) => write!(f, "{title}"),
        }
    }
}

/// A set of entries from two or more packages that collide on a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictGroup {
    pub conflict_kind: ConflictKind,
    pub key: ConflictKey,
    /// All colliding entries, in detection order.
    pub members: Vec<CatalogEntry>,
    pub winner: CatalogEntry,
    /// `members` without the winner, in their original relative order.
    pub losers: Vec<CatalogEntry>,
}

impl ConflictGroup {
    /// Sorted, de-duplicated names of the packages involved.
    pub fn involved_packages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .members
            .iter()
            .map(|e| e.owner_package.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Sorted, de-duplicated origin labels of the members.
    pub fn origin_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.members.iter().map(CatalogEntry::origin_label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Losers grouped by owning package.
    pub fn losers_by_package(&self) -> BTreeMap<&str, Vec<&CatalogEntry>> {
        let mut grouped: BTreeMap<&str, Vec<&CatalogEntry>> = BTreeMap::new();
        for entry in &self.losers {
            grouped
                .entry(entry.owner_package.as_str())
                .or_default()
                .push(entry);
        }
        grouped
    }
}

// ---------------------------------------------------------------------------
// Removal plan
// ---------------------------------------------------------------------------

/// Ids one package's manifest must have disabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemovalPlan {
    pub package_name: String,
    pub manifest_path: PathBuf,
    /// Insertion-ordered, duplicate-free.
    ids_to_remove: Vec<u32>,
}

impl RemovalPlan {
    pub fn new(package_name: impl Into<String>, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            package_name: package_name.into(),
            manifest_path: manifest_path.into(),
            ids_to_remove: Vec::new(),
        }
    }

    /// Build a plan from a list of ids, dropping repeats.
    pub fn with_ids(
        package_name: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
        ids: impl IntoIterator<Item = u32>,
    ) -> Self {
        let mut plan = Self::new(package_name, manifest_path);
        for id in ids {
            plan.add_id(id);
        }
        plan
    }

    /// Append `id` unless it is already planned. Returns whether it was added.
    pub fn add_id(&mut self, id: u32) -> bool {
        if self.ids_to_remove.contains(&id) {
            return false;
        }
        self.ids_to_remove.push(id);
        true
    }

    pub fn ids_to_remove(&self) -> &[u32] {
        &self.ids_to_remove
    }

    pub fn is_empty(&self) -> bool {
        self.ids_to_remove.is_empty()
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Union `other`'s ids into this plan, keeping first-seen order.
    ///
    /// Both plans must target the same package and manifest.
    pub fn merge(&mut self, other: &RemovalPlan) -> Result<(), PlanError> {
        if self.package_name != other.package_name {
            return Err(PlanError::PackageMismatch {
                package: self.package_name.clone(),
                other: other.package_name.clone(),
            });
        }
        if self.manifest_path != other.manifest_path {
            return Err(PlanError::ManifestMismatch {
                path: self.manifest_path.clone(),
                other: other.manifest_path.clone(),
            });
        }
        for &id in &other.ids_to_remove {
            self.add_id(id);
        }
        Ok(())
    }
}
