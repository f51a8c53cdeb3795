//! Winner selection and removal planning.
//!
//! Members of a conflict group are ranked by `(priority, package name)`; the
//! lowest tuple wins. Priority is looked up through [`PriorityLookup`] and
//! falls back to an explicit default for unknown packages, so the ordering is
//! total and reproducible even when priorities collide or are missing.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::conflict::detector::{IdConflicts, TitleConflicts};
use crate::models::{CatalogEntry, ConflictGroup, ConflictKey, ConflictKind, RemovalPlan};
use crate::priority::PriorityLookup;

/// Builds conflict records using a priority lookup.
pub struct ResolutionPlanner<'a, P: PriorityLookup + ?Sized> {
    priorities: &'a P,
    default_priority: i64,
}

impl<'a, P: PriorityLookup + ?Sized> ResolutionPlanner<'a, P> {
    pub fn new(priorities: &'a P, default_priority: i64) -> Self {
        Self {
            priorities,
            default_priority,
        }
    }

    /// Priority of the entry's package, or the default when unknown.
    pub fn entry_priority(&self, entry: &CatalogEntry) -> i64 {
        self.priorities
            .priority_of(&entry.owner_package)
            .unwrap_or(self.default_priority)
    }

    /// Index of the winning member. Ties on the full key keep the earliest.
    fn winner_index(&self, members: &[CatalogEntry]) -> Option<usize> {
        members
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                self.entry_priority(a)
                    .cmp(&self.entry_priority(b))
                    .then_with(|| a.owner_package.cmp(&b.owner_package))
            })
            .map(|(index, _)| index)
    }

    /// Turn one group of colliding entries into a [`ConflictGroup`].
    ///
    /// Returns `None` for an empty group.
    pub fn build_group(
        &self,
        kind: ConflictKind,
        key: ConflictKey,
        members: &[CatalogEntry],
    ) -> Option<ConflictGroup> {
        let winner_at = self.winner_index(members)?;
        let winner = members[winner_at].clone();
        let losers = members
            .iter()
            .enumerate()
            .filter(|&(index, _)| index != winner_at)
            .map(|(_, entry)| entry.clone())
            .collect();

        debug!(
            kind = %kind,
            key = %key,
            winner = %winner.owner_package,
            members = members.len(),
            "conflict resolved"
        );
        Some(ConflictGroup {
            conflict_kind: kind,
            key,
            members: members.to_vec(),
            winner,
            losers,
        })
    }

    /// Build conflict records: id conflicts first, then title conflicts, each
    /// in detection order.
    pub fn build_conflict_records(
        &self,
        id_conflicts: &IdConflicts,
        title_conflicts: &TitleConflicts,
    ) -> Vec<ConflictGroup> {
        let mut records = Vec::with_capacity(id_conflicts.len() + title_conflicts.len());
        for (&id, members) in id_conflicts.iter() {
            records.extend(self.build_group(ConflictKind::Id, ConflictKey::Id(id), members));
        }
        for (title, members) in title_conflicts.iter() {
            records.extend(self.build_group(
                ConflictKind::Title,
                ConflictKey::Title(title.clone()),
                members,
            ));
        }
        info!(records = records.len(), "conflict records built");
        records
    }
}

/// Turn conflict losers into one removal plan per package.
///
/// An id lost in several groups is planned once. A loser carrying the
/// winner's id inside the winner's package is skipped: disabling it would
/// disable the winner too.
pub fn plan_resolutions<'a, I>(groups: I) -> BTreeMap<String, RemovalPlan>
where
    I: IntoIterator<Item = &'a ConflictGroup>,
{
    let mut plans: BTreeMap<String, RemovalPlan> = BTreeMap::new();
    for group in groups {
        for (package, losers) in group.losers_by_package() {
            for loser in losers {
                if package == group.winner.owner_package && loser.id == group.winner.id {
                    debug!(
                        package,
                        id = loser.id,
                        "loser shares the winner's declaration, not planned"
                    );
                    continue;
                }
                plans
                    .entry(package.to_string())
                    .or_insert_with(|| RemovalPlan::new(package, &loser.origin_path))
                    .add_id(loser.id);
            }
        }
    }
    info!(plans = plans.len(), "resolution plans prepared");
    plans
}
