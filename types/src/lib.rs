use serde::{Deserialize, Serialize};

// ── Normalized address record ────────────────────────────────────────────

/// One house on one street in one schedule slot.
///
/// Field names on the wire follow what the lookup bot reads:
/// `queue_full` is the slot key and `city` is the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(default)]
    pub branch: Option<String>,
    pub queue: u8,
    pub subqueue: u8,
    /// "queue.subqueue", e.g. "3.2"
    #[serde(rename = "queue_full")]
    pub slot_key: String,
    /// Settlement with its marker, e.g. "м.Полтава", "с.Щербані"
    #[serde(rename = "city", default)]
    pub settlement: Option<String>,
    /// Street with its marker, e.g. "вул. Грабчака"
    pub street: String,
    /// House identifier, e.g. "10", "10а", "1/49"
    pub house: String,
}

impl NormalizedRecord {
    /// Deduplication identity: (branch, slot, settlement, street, house).
    pub fn identity(&self) -> RecordKey {
        RecordKey {
            branch: self.branch.clone(),
            slot_key: self.slot_key.clone(),
            settlement: self.settlement.clone(),
            street: self.street.clone(),
            house: self.house.clone(),
        }
    }

    /// Human-readable address, e.g. "м.Полтава, вул. Грабчака, буд. 10"
    pub fn display_address(&self) -> String {
        match &self.settlement {
            Some(s) if !s.is_empty() => format!("{s}, {}, буд. {}", self.street, self.house),
            _ => format!("{}, буд. {}", self.street, self.house),
        }
    }
}

/// See [`NormalizedRecord::identity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub branch: Option<String>,
    pub slot_key: String,
    pub settlement: Option<String>,
    pub street: String,
    pub house: String,
}

// ── Diagnostics ──────────────────────────────────────────────────────────

/// A record whose settlement could not be repaired. Excluded from the
/// canonical dataset and kept for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedSettlement {
    #[serde(default)]
    pub original_value: Option<String>,
    pub street: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub house: String,
    pub slot_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsedReason {
    /// No settlement, street or house could be recognized.
    NoSegments,
    /// Address cell too short to hold an address.
    TooShort,
}

/// A data row that produced no records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnparsedRow {
    pub slot_key: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub raw_text: String,
    pub reason: UnparsedReason,
}
