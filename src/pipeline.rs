use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::assemble::{ExtractStats, RecordAssembler, slot_count_key};
use crate::classify::{RowKind, classify_row};
use crate::config::ExtractConfig;
use crate::context::ContextTracker;
use crate::error::ExtractError;
use crate::reconcile::{ReconcileStats, Reconciler};
use crate::segment::AddressSegmenter;
use crate::types::{NormalizedRecord, UnparsedRow, UnresolvedSettlement};

// ── Input rows ───────────────────────────────────────────────────────

/// One row of the source document, cells in column order.
///
/// Table rows carry the header/marker in the first cell and the addresses
/// in the second. A page-text line is a one-cell row whose only cell plays
/// both parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<String>,
}

impl Row {
    pub fn new<S: Into<String>>(cells: impl IntoIterator<Item = S>) -> Self {
        Row {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn line(text: impl Into<String>) -> Self {
        Row {
            cells: vec![text.into()],
        }
    }

    /// First cell, if it has any text.
    pub fn lead(&self) -> Option<&str> {
        self.cells.first().map(|c| c.trim()).filter(|c| !c.is_empty())
    }

    /// The cell holding address text.
    pub fn address_cell(&self) -> &str {
        match self.cells.as_slice() {
            [] => "",
            [only] => only.trim(),
            [_, second, ..] => second.trim(),
        }
    }
}

// ── Output ───────────────────────────────────────────────────────────

/// Everything one pass over a document produces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractReport {
    pub records: Vec<NormalizedRecord>,
    pub unresolved: Vec<UnresolvedSettlement>,
    pub unparsed: Vec<UnparsedRow>,
    /// "branch.queue.subqueue" → records in the final output
    pub slot_counts: BTreeMap<String, usize>,
    pub stats: ExtractStats,
    pub reconcile: ReconcileStats,
}

pub fn count_slots(records: &[NormalizedRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts
            .entry(slot_count_key(r.branch.as_deref(), r.queue, r.subqueue))
            .or_insert(0) += 1;
    }
    counts
}

// ── Pipeline ─────────────────────────────────────────────────────────

/// Single sequential pass: classify → track context → segment → assemble.
pub struct Pipeline<'c> {
    config: &'c ExtractConfig,
    segmenter: AddressSegmenter,
    tracker: ContextTracker,
    assembler: RecordAssembler,
}

impl<'c> Pipeline<'c> {
    pub fn new(config: &'c ExtractConfig) -> Self {
        Pipeline {
            config,
            segmenter: AddressSegmenter::new(config.organizations.clone()),
            tracker: ContextTracker::new(config.default_settlement.clone()),
            assembler: RecordAssembler::new(),
        }
    }

    pub fn process_row(&mut self, row: &Row) {
        self.assembler.stats_mut().rows_total += 1;

        let Some(lead) = row.lead() else {
            self.assembler.stats_mut().empty_rows += 1;
            return;
        };

        let kind = classify_row(lead);
        let stats = self.assembler.stats_mut();
        match &kind {
            RowKind::BranchHeader(_) => stats.branch_headers += 1,
            RowKind::QueueHeader { .. } => stats.queue_headers += 1,
            RowKind::SubqueueHeader { .. } => stats.subqueue_headers += 1,
            RowKind::Data => stats.data_rows += 1,
        }

        let address_text = row.address_cell();
        let Some(slotted) = self.tracker.observe(&kind, address_text) else {
            if kind == RowKind::Data {
                debug!("no slot yet, skipping: {address_text:?}");
                self.assembler.stats_mut().rows_without_slot += 1;
            }
            return;
        };

        if !self.config.keeps_branch(slotted.context.branch.as_deref()) {
            self.assembler.stats_mut().rows_filtered += 1;
            return;
        }

        if address_text.is_empty() {
            self.assembler.stats_mut().empty_rows += 1;
            return;
        }
        if address_text.chars().count() < self.config.min_cell_chars {
            self.assembler.add_short_row(&slotted);
            return;
        }

        let segmentation = self
            .segmenter
            .segment(address_text, slotted.context.settlement.as_deref());
        if let Some(settlement) = segmentation.last_settlement {
            self.tracker.set_settlement(settlement);
        }
        self.assembler.add_row(&slotted, &segmentation.segments);
    }

    /// Assemble, then reconcile settlements.
    pub fn finish(self) -> ExtractReport {
        let assembly = self.assembler.finish();
        let stats = assembly.stats;
        info!(
            "{} rows: {} data, {} without slot, {} unparsed, {} too short; {} records ({} duplicates dropped)",
            stats.rows_total,
            stats.data_rows,
            stats.rows_without_slot,
            stats.unparsed_rows,
            stats.short_rows,
            stats.records,
            stats.duplicate_records
        );
        for (slot, count) in &assembly.slot_counts {
            debug!("  {slot}: {count} records");
        }

        let reconciled = Reconciler::new(&self.config.reconcile).reconcile(assembly.records);

        ExtractReport {
            slot_counts: count_slots(&reconciled.records),
            records: reconciled.records,
            unresolved: reconciled.unresolved,
            unparsed: assembly.unparsed,
            stats,
            reconcile: reconciled.stats,
        }
    }
}

/// Run the whole pass over materialized rows. An empty document yields an
/// empty report.
pub fn extract(rows: &[Row], config: &ExtractConfig) -> ExtractReport {
    let mut pipeline = Pipeline::new(config);
    for row in rows {
        pipeline.process_row(row);
    }
    pipeline.finish()
}

/// [`extract`], treating a document with no rows at all as a caller error.
pub fn extract_document(
    rows: &[Row],
    config: &ExtractConfig,
) -> Result<ExtractReport, ExtractError> {
    if rows.is_empty() {
        return Err(ExtractError::EmptyDocument);
    }
    Ok(extract(rows, config))
}
