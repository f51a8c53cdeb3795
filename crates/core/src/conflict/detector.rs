//! Conflict detection logic.
//!
//! Entries are grouped by id and by normalized localized title. A group only
//! counts as a conflict when its members come from at least two distinct
//! origins; repeats inside a single package are that package's own business.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::models::CatalogEntry;
use crate::multimap::OrderedMultimap;

/// Conflicting entries keyed by shared id, in first-seen order.
pub type IdConflicts = OrderedMultimap<u32, CatalogEntry>;

/// Conflicting entries keyed by shared normalized title, in first-seen order.
pub type TitleConflicts = OrderedMultimap<String, CatalogEntry>;

/// Stateless conflict detector.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Group entries sharing an id across different origins.
    pub fn detect_id_conflicts<'a, I>(entries: I) -> IdConflicts
    where
        I: IntoIterator<Item = &'a CatalogEntry>,
    {
        let mut grouped: IdConflicts = entries.into_iter().map(|e| (e.id, e.clone())).collect();
        let total = grouped.len();
        grouped.retain(|_, group| spans_origins(group));

        info!(keys = total, conflicts = grouped.len(), "id conflict detection complete");
        grouped
    }

    /// Group entries sharing a normalized localized title across different
    /// origins. Entries without a localized title are left out.
    pub fn detect_title_conflicts<'a, I>(entries: I) -> TitleConflicts
    where
        I: IntoIterator<Item = &'a CatalogEntry>,
    {
        let mut grouped = TitleConflicts::new();
        for entry in entries {
            let key = entry.normalized_title();
            if key.is_empty() {
                continue;
            }
            grouped.insert(key, entry.clone());
        }
        let total = grouped.len();
        grouped.retain(|title, group| {
            let conflicting = spans_origins(group);
            if conflicting {
                debug!(title = %title, members = group.len(), "title conflict detected");
            }
            conflicting
        });

        info!(keys = total, conflicts = grouped.len(), "title conflict detection complete");
        grouped
    }
}

/// Whether the entries come from two or more distinct origin labels.
fn spans_origins(group: &[CatalogEntry]) -> bool {
    let Some(first) = group.first() else {
        return false;
    };
    let first = first.origin_label();
    group.iter().any(|e| e.origin_label() != first)
}

/// Number of distinct origin labels among `group`.
pub fn origin_count(group: &[CatalogEntry]) -> usize {
    group
        .iter()
        .map(CatalogEntry::origin_label)
        .collect::<HashSet<_>>()
        .len()
}
