//! Repair of truncated settlement names after assembly.
//!
//! Table extraction sometimes cuts a settlement down to its marker and one
//! or two letters ("м.І", "с.В"). Such records are fixed from the override
//! table, then from nearby records on the same street, and otherwise set
//! aside for manual review.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReconcileConfig;
use crate::types::{NormalizedRecord, UnresolvedSettlement};

const SETTLEMENT_MARKERS: &[&str] = &["смт.", "м.", "с."];

/// Whether a settlement looks complete: more than two characters remain
/// once the marker is stripped. A missing settlement is never complete.
pub fn is_well_formed_settlement(settlement: Option<&str>) -> bool {
    let Some(settlement) = settlement else {
        return false;
    };
    let trimmed = settlement.trim();
    let lower = trimmed.to_lowercase();
    let name = SETTLEMENT_MARKERS
        .iter()
        .find(|m| lower.starts_with(**m))
        .map(|m| &trimmed[m.len()..])
        .unwrap_or(trimmed);
    name.trim().chars().count() > 2
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ReconcileStats {
    pub checked: usize,
    pub fixed_by_override: usize,
    pub fixed_by_context: usize,
    pub unresolved: usize,
    /// Repaired records that turned out to duplicate an earlier record.
    pub merged_duplicates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub records: Vec<NormalizedRecord>,
    pub unresolved: Vec<UnresolvedSettlement>,
    pub stats: ReconcileStats,
}

pub struct Reconciler {
    overrides: HashMap<(String, String, String), String>,
    lookback: usize,
}

impl Reconciler {
    pub fn new(config: &ReconcileConfig) -> Self {
        Reconciler {
            overrides: config.override_table(),
            lookback: config.lookback,
        }
    }

    /// Run the repair pass. Records keep their order; unresolved ones move
    /// to [`Reconciliation::unresolved`]. Running it again on its own output
    /// changes nothing.
    pub fn reconcile(&self, records: Vec<NormalizedRecord>) -> Reconciliation {
        let mut out: Vec<NormalizedRecord> = Vec::with_capacity(records.len());
        let mut seen = HashSet::with_capacity(records.len());
        let mut unresolved = Vec::new();
        let mut stats = ReconcileStats::default();

        for mut record in records {
            if !is_well_formed_settlement(record.settlement.as_deref()) {
                stats.checked += 1;
                if let Some(fixed) = self.lookup_override(&record) {
                    debug!(
                        "override: {:?} → {fixed} ({})",
                        record.settlement,
                        record.display_address()
                    );
                    record.settlement = Some(fixed);
                    stats.fixed_by_override += 1;
                } else if let Some(fixed) = self.lookup_neighbour(&record, &out) {
                    debug!(
                        "context: {:?} → {fixed} ({})",
                        record.settlement,
                        record.display_address()
                    );
                    record.settlement = Some(fixed);
                    stats.fixed_by_context += 1;
                } else {
                    stats.unresolved += 1;
                    unresolved.push(UnresolvedSettlement {
                        original_value: record.settlement,
                        street: record.street,
                        branch: record.branch,
                        house: record.house,
                        slot_key: record.slot_key,
                    });
                    continue;
                }
            }

            if seen.insert(record.identity()) {
                out.push(record);
            } else {
                stats.merged_duplicates += 1;
            }
        }

        info!(
            "reconciled {} records: {} by override, {} by context, {} unresolved",
            out.len(),
            stats.fixed_by_override,
            stats.fixed_by_context,
            stats.unresolved
        );
        log_unresolved_summary(&unresolved);

        Reconciliation {
            records: out,
            unresolved,
            stats,
        }
    }

    fn lookup_override(&self, record: &NormalizedRecord) -> Option<String> {
        let settlement = record.settlement.clone()?;
        let branch = record.branch.clone()?;
        self.overrides
            .get(&(settlement, record.street.clone(), branch))
            .cloned()
    }

    /// Newest-first scan of the last `lookback` kept records for one on the
    /// same street and branch, preferring the same slot.
    fn lookup_neighbour(
        &self,
        record: &NormalizedRecord,
        kept: &[NormalizedRecord],
    ) -> Option<String> {
        let window = &kept[kept.len().saturating_sub(self.lookback)..];
        let mut fallback = None;
        for prev in window.iter().rev() {
            if prev.street != record.street
                || prev.branch != record.branch
                || !is_well_formed_settlement(prev.settlement.as_deref())
            {
                continue;
            }
            if prev.slot_key == record.slot_key {
                return prev.settlement.clone();
            }
            if fallback.is_none() {
                fallback = prev.settlement.clone();
            }
        }
        fallback
    }
}

/// One warning line per distinct leftover name, with a few of its streets.
fn log_unresolved_summary(unresolved: &[UnresolvedSettlement]) {
    let mut by_name: HashMap<&str, Vec<&UnresolvedSettlement>> = HashMap::new();
    for u in unresolved {
        by_name
            .entry(u.original_value.as_deref().unwrap_or("<none>"))
            .or_default()
            .push(u);
    }
    let mut names: Vec<_> = by_name.into_iter().collect();
    names.sort_by(|a, b| a.0.cmp(b.0));
    for (name, entries) in names {
        let mut streets: Vec<String> = entries
            .iter()
            .map(|u| format!("{} [{}]", u.street, u.branch.as_deref().unwrap_or("-")))
            .collect();
        streets.sort();
        streets.dedup();
        streets.truncate(5);
        warn!(
            "unresolved settlement {name}: {} records, e.g. {}",
            entries.len(),
            streets.join("; ")
        );
    }
}
