//! Serializable snapshot of a scan: per-package statistics, one row per
//! conflict group and the planned removals.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::models::{ConflictGroup, ConflictKey, ConflictKind, RemovalPlan};

/// Conflicts one package shares with another.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartnerStats {
    pub name: String,
    /// Distinct conflict keys both packages take part in.
    pub shared_conflicts: usize,
    /// Entry count of the partner package.
    pub partner_entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageStats {
    pub name: String,
    pub priority: i64,
    pub total_entries: usize,
    /// Distinct conflict keys the package takes part in.
    pub conflicting_entries: usize,
    /// Sorted by partner name.
    pub partners: Vec<PartnerStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictRow {
    pub kind: ConflictKind,
    pub key: ConflictKey,
    /// Sorted, distinct display titles of the members.
    pub titles: Vec<String>,
    /// Sorted, distinct ids of the members.
    pub ids: Vec<u32>,
    /// Sorted origin labels.
    pub sources: Vec<String>,
    pub winner: String,
    /// Packages planned to lose, sorted.
    pub losers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub generated_at: DateTime<Utc>,
    pub packages: Vec<PackageStats>,
    pub conflicts: Vec<ConflictRow>,
    pub plans: Vec<RemovalPlan>,
}

impl ConflictReport {
    pub fn build(
        catalog: &Catalog,
        groups: &[ConflictGroup],
        plans: &BTreeMap<String, RemovalPlan>,
    ) -> Self {
        let mut keys: BTreeMap<&str, HashSet<(ConflictKind, &ConflictKey)>> = BTreeMap::new();
        let mut shared: BTreeMap<(&str, &str), HashSet<(ConflictKind, &ConflictKey)>> =
            BTreeMap::new();

        for group in groups {
            let key = (group.conflict_kind, &group.key);
            let involved = group.involved_packages();
            for (i, &left) in involved.iter().enumerate() {
                keys.entry(left).or_default().insert(key);
                for &right in &involved[i + 1..] {
                    shared.entry((left, right)).or_default().insert(key);
                    shared.entry((right, left)).or_default().insert(key);
                }
            }
        }

        let packages = catalog
            .packages()
            .map(|package| {
                let partners = shared
                    .iter()
                    .filter(|((left, _), _)| *left == package.name)
                    .map(|((_, right), set)| PartnerStats {
                        name: right.to_string(),
                        shared_conflicts: set.len(),
                        partner_entries: catalog
                            .package(right)
                            .map(|p| p.entry_count())
                            .unwrap_or(0),
                    })
                    .collect();
                PackageStats {
                    name: package.name.clone(),
                    priority: package.priority,
                    total_entries: package.entry_count(),
                    conflicting_entries: keys.get(package.name.as_str()).map_or(0, HashSet::len),
                    partners,
                }
            })
            .collect();

        let conflicts = groups.iter().map(conflict_row).collect();

        Self {
            generated_at: Utc::now(),
            packages,
            conflicts,
            plans: plans.values().cloned().collect(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn id_conflict_count(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::Id)
            .count()
    }

    pub fn title_conflict_count(&self) -> usize {
        self.conflicts.len() - self.id_conflict_count()
    }
}

fn conflict_row(group: &ConflictGroup) -> ConflictRow {
    let titles: BTreeSet<String> = group
        .members
        .iter()
        .map(|e| e.display_title().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let ids: BTreeSet<u32> = group.members.iter().map(|e| e.id).collect();
    let losers: BTreeSet<String> = group
        .losers
        .iter()
        .filter(|e| e.owner_package != group.winner.owner_package)
        .map(|e| e.owner_package.clone())
        .collect();

    ConflictRow {
        kind: group.conflict_kind,
        key: group.key.clone(),
        titles: titles.into_iter().collect(),
        ids: ids.into_iter().collect(),
        sources: group.origin_labels(),
        winner: group.winner.owner_package.clone(),
        losers: losers.into_iter().collect(),
    }
}
