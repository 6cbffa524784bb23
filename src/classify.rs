//! Row classification: which structural role does a row's lead cell play?
//!
//! Real header examples:
//!   Полтавська філія
//!   Кременчуцька дільниця АТ "Полтаваобленерго"
//!   Перша черга
//!   Третя черга ІІ підчерга
//!   П'ята черга І підчерга (П’ята / Пʼята / П.ята all occur)

use regex::Regex;
use std::sync::LazyLock;

const ORDINALS: &str = r"Перша|Друга|Третя|Четверта|П[.'’ʼ]ята|Шоста";

// Longest first so "ІІ" never matches as "І".
const ROMANS: &str = r"ІІ|II|І|I";

pub const BRANCH_NAMES: &[&str] = &[
    "Полтавська",
    "Кременчуцька",
    "Лубенська",
    "Миргородська",
    "Хорольська",
    "Гадяцька",
];

static RE_SUBQUEUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<ordinal>{ORDINALS})\s+черга\s+(?P<roman>{ROMANS})\s+підчерга"
    ))
    .unwrap()
});

static RE_QUEUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(?P<ordinal>{ORDINALS})\s+черга\s*$")).unwrap()
});

static RE_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?P<branch>{}).*(?:філія|дільниця)",
        BRANCH_NAMES.join("|")
    ))
    .unwrap()
});

/// Structural role of a row, decided from its lead cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    BranchHeader(String),
    QueueHeader { queue: u8 },
    SubqueueHeader { queue: u8, subqueue: u8 },
    Data,
}

/// Ordinal word → queue number (1–6).
pub fn ordinal_number(word: &str) -> Option<u8> {
    let word = word.to_lowercase();
    match word.as_str() {
        "перша" => Some(1),
        "друга" => Some(2),
        "третя" => Some(3),
        "четверта" => Some(4),
        "шоста" => Some(6),
        _ => {
            let mut chars = word.chars();
            let apostrophe_form = chars.next() == Some('п')
                && matches!(chars.next(), Some('.' | '\'' | '’' | 'ʼ'))
                && chars.as_str() == "ята";
            apostrophe_form.then_some(5)
        }
    }
}

/// Roman numeral (Cyrillic І or Latin I) → sub-queue number.
pub fn roman_number(numeral: &str) -> Option<u8> {
    match numeral {
        "І" | "I" => Some(1),
        "ІІ" | "II" => Some(2),
        _ => None,
    }
}

/// Classify a lead cell. Sub-queue is checked before queue because both
/// start with "<ordinal> черга"; anything unrecognized is data.
pub fn classify_row(lead: &str) -> RowKind {
    let lead = lead.trim();

    if let Some(caps) = RE_SUBQUEUE.captures(lead) {
        let queue = ordinal_number(&caps["ordinal"]);
        let subqueue = roman_number(&caps["roman"].to_uppercase());
        if let (Some(queue), Some(subqueue)) = (queue, subqueue) {
            return RowKind::SubqueueHeader { queue, subqueue };
        }
        return RowKind::Data;
    }

    if let Some(caps) = RE_QUEUE.captures(lead) {
        return match ordinal_number(&caps["ordinal"]) {
            Some(queue) => RowKind::QueueHeader { queue },
            None => RowKind::Data,
        };
    }

    if let Some(caps) = RE_BRANCH.captures(lead) {
        return RowKind::BranchHeader(canonical_branch(&caps["branch"]));
    }

    RowKind::Data
}

/// Map a case-variant branch match back to its canonical spelling.
fn canonical_branch(matched: &str) -> String {
    let lower = matched.to_lowercase();
    BRANCH_NAMES
        .iter()
        .find(|name| name.to_lowercase() == lower)
        .map(|name| name.to_string())
        .unwrap_or_else(|| matched.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_header() {
        assert_eq!(classify_row("Перша черга"), RowKind::QueueHeader { queue: 1 });
        assert_eq!(classify_row("  Шоста черга  "), RowKind::QueueHeader { queue: 6 });
        assert_eq!(classify_row("ДРУГА ЧЕРГА"), RowKind::QueueHeader { queue: 2 });
    }

    #[test]
    fn test_subqueue_header_takes_precedence() {
        assert_eq!(
            classify_row("Перша черга І підчерга"),
            RowKind::SubqueueHeader { queue: 1, subqueue: 1 }
        );
        assert_eq!(
            classify_row("Третя черга ІІ підчерга (00:00-04:00)"),
            RowKind::SubqueueHeader { queue: 3, subqueue: 2 }
        );
        assert_eq!(
            classify_row("Четверта черга II підчерга"),
            RowKind::SubqueueHeader { queue: 4, subqueue: 2 }
        );
    }

    #[test]
    fn test_fifth_ordinal_apostrophe_variants() {
        for text in ["П'ята черга", "П’ята черга", "Пʼята черга", "П.ята черга"] {
            assert_eq!(classify_row(text), RowKind::QueueHeader { queue: 5 }, "{text}");
        }
    }

    #[test]
    fn test_branch_header() {
        assert_eq!(
            classify_row("Кременчуцька філія"),
            RowKind::BranchHeader("Кременчуцька".into())
        );
        assert_eq!(
            classify_row("ЛУБЕНСЬКА дільниця"),
            RowKind::BranchHeader("Лубенська".into())
        );
    }

    #[test]
    fn test_unknown_ordinal_is_data() {
        assert_eq!(classify_row("Сьома черга"), RowKind::Data);
        assert_eq!(classify_row("Перша черга ІІІ підчерга"), RowKind::Data);
    }

    #[test]
    fn test_address_text_is_data() {
        assert_eq!(classify_row("м.Полтава: вул. Грабчака, 10"), RowKind::Data);
        assert_eq!(classify_row("Полтавська, 12"), RowKind::Data);
    }
}
