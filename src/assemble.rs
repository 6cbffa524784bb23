use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::context::SlottedRow;
use crate::segment::AddressSegment;
use crate::types::{NormalizedRecord, RecordKey, UnparsedReason, UnparsedRow};

/// Counters for one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct ExtractStats {
    pub rows_total: usize,
    pub empty_rows: usize,
    pub branch_headers: usize,
    pub queue_headers: usize,
    pub subqueue_headers: usize,
    pub data_rows: usize,
    /// Data rows seen before both queue and sub-queue were set.
    pub rows_without_slot: usize,
    /// Data rows skipped by the branch filter.
    pub rows_filtered: usize,
    pub processed_rows: usize,
    pub unparsed_rows: usize,
    pub short_rows: usize,
    pub duplicate_records: usize,
    pub records: usize,
}

/// Builds records from segments, deduplicating as it goes.
#[derive(Debug, Default)]
pub struct RecordAssembler {
    seen: HashSet<RecordKey>,
    records: Vec<NormalizedRecord>,
    unparsed: Vec<UnparsedRow>,
    /// "branch.queue.subqueue" → unique records
    slot_counts: BTreeMap<String, usize>,
    stats: ExtractStats,
}

/// What a finished assembly pass hands on to reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub records: Vec<NormalizedRecord>,
    pub unparsed: Vec<UnparsedRow>,
    pub slot_counts: BTreeMap<String, usize>,
    pub stats: ExtractStats,
}

/// Slot count key; `-` stands in for a missing branch.
pub fn slot_count_key(branch: Option<&str>, queue: u8, subqueue: u8) -> String {
    format!("{}.{queue}.{subqueue}", branch.unwrap_or("-"))
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats_mut(&mut self) -> &mut ExtractStats {
        &mut self.stats
    }

    /// Add every segment of one row. Returns how many new records it made.
    pub fn add_row(&mut self, row: &SlottedRow<'_>, segments: &[AddressSegment]) -> usize {
        self.stats.processed_rows += 1;

        if segments.is_empty() {
            self.log_unparsed(row, UnparsedReason::NoSegments);
            return 0;
        }

        let slot_key = format!("{}.{}", row.queue, row.subqueue);
        let mut added = 0;
        for segment in segments {
            let record = NormalizedRecord {
                branch: row.context.branch.clone(),
                queue: row.queue,
                subqueue: row.subqueue,
                slot_key: slot_key.clone(),
                settlement: segment.settlement.clone(),
                street: segment.street.clone(),
                house: segment.house_token.clone(),
            };
            if self.push(record) {
                added += 1;
            }
        }
        added
    }

    /// Record a row whose address cell is too short to contain an address.
    pub fn add_short_row(&mut self, row: &SlottedRow<'_>) {
        self.stats.short_rows += 1;
        self.log_unparsed(row, UnparsedReason::TooShort);
    }

    fn push(&mut self, record: NormalizedRecord) -> bool {
        if !self.seen.insert(record.identity()) {
            self.stats.duplicate_records += 1;
            return false;
        }
        let key = slot_count_key(record.branch.as_deref(), record.queue, record.subqueue);
        *self.slot_counts.entry(key).or_insert(0) += 1;
        self.records.push(record);
        true
    }

    fn log_unparsed(&mut self, row: &SlottedRow<'_>, reason: UnparsedReason) {
        let slot_key = format!("{}.{}", row.queue, row.subqueue);
        let branch = row.context.branch.clone();
        match reason {
            UnparsedReason::NoSegments => {
                self.stats.unparsed_rows += 1;
                warn!(
                    "unparsed row [{slot_key}] {}: {}",
                    branch.as_deref().unwrap_or("-"),
                    row.address_text
                );
            }
            UnparsedReason::TooShort => {
                debug!("short row [{slot_key}]: {:?}", row.address_text);
            }
        }
        self.unparsed.push(UnparsedRow {
            slot_key,
            branch,
            raw_text: row.address_text.to_string(),
            reason,
        });
    }

    pub fn finish(mut self) -> Assembly {
        self.stats.records = self.records.len();
        Assembly {
            records: self.records,
            unparsed: self.unparsed,
            slot_counts: self.slot_counts,
            stats: self.stats,
        }
    }
}
