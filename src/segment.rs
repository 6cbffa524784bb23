//! Splitting a free-text address cell into (settlement, street, house).
//!
//! Real cell examples:
//!   м.Полтава: вул. Грабчака, 10, 12, 14-16; вул. Баленка (б. 1, 3)
//!   с.Щербані вул. Садова 2, 4 с.Мачухи: пров. Шкільний, 7
//!   Залізна, 10, 12, 14            (street without a marker)
//!   ТОВ "Агросвіт" 12              (company, not a street)

use regex::Regex;
use std::sync::LazyLock;

use crate::config::OrganizationDenylist;
use crate::houses::expand_house_list;

// Name characters: Ukrainian letters, apostrophes, hyphen, spaces.
const NAME_TAIL: &str = r"[А-ЯІЇЄҐа-яіїєґ'’ʼ\s-]*?";
const STREET_MARKERS: &str = r"вул|пров|просп|пл|бульв";

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// {м.|с.|смт.}{Name} terminated by punctuation or by the next street marker.
// The street marker is captured (not consumed from the scope) so the scope
// can start at it.
static RE_SETTLEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(?P<marker>(?i:смт|м|с)\.)\s*(?P<name>[А-ЯІЇЄҐ]{NAME_TAIL})(?:\s*[:;.]|(?P<street>\s+(?i:{STREET_MARKERS})\.))"
    ))
    .unwrap()
});

// "вул. М.Бірюзова": an initial right after a street marker is not a settlement.
static RE_TRAILING_STREET_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?i:{STREET_MARKERS})\.\s*$")).unwrap()
});

// {вул.|пров.|…}{Name} up to a comma, semicolon, bracket or digit. The
// name may open with an initial ("М.Бірюзова"). The terminator is captured
// so the house list can start at it.
static RE_STREET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(?P<marker>(?i:{STREET_MARKERS})\.)\s*(?P<name>(?:[А-ЯІЇЄҐ]\.\s*)?[А-ЯІЇЄҐ]{NAME_TAIL})(?P<end>\s*[,;(\d])"
    ))
    .unwrap()
});

// {Name}[,] {digits…} with no street marker at all.
static RE_IMPLICIT_STREET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<name>[А-ЯІЇЄҐ][А-ЯІЇЄҐа-яіїєґ'’ʼ-]*(?:\s+[А-ЯІЇЄҐа-яіїєґ'’ʼ-]+)*?)(?:\s*,\s*|\s+)(?P<houses>\d(?:[\d\s,;/-]|[а-яіїєґ]\b)*)",
    )
    .unwrap()
});

/// One house on one street, as read from a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSegment {
    pub settlement: Option<String>,
    pub street: String,
    pub house_token: String,
}

/// Everything recovered from one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub segments: Vec<AddressSegment>,
    /// Last settlement the cell named explicitly, whether or not any street
    /// followed it.
    pub last_settlement: Option<String>,
}

/// A span of the cell that belongs to one settlement.
struct Scope<'t> {
    settlement: Option<String>,
    text: &'t str,
}

pub struct AddressSegmenter {
    denylist: OrganizationDenylist,
}

impl Default for AddressSegmenter {
    fn default() -> Self {
        AddressSegmenter::new(OrganizationDenylist::default())
    }
}

impl AddressSegmenter {
    pub fn new(denylist: OrganizationDenylist) -> Self {
        AddressSegmenter { denylist }
    }

    /// Segment a cell, using `ambient` for text outside any settlement scope.
    /// Output is in left-to-right text order.
    pub fn segment(&self, text: &str, ambient: Option<&str>) -> Segmentation {
        let normalized = RE_WHITESPACE.replace_all(text, " ");
        let normalized = normalized.trim();

        let scopes = split_settlement_scopes(normalized, ambient);
        let last_settlement = scopes
            .iter()
            .rev()
            .find_map(|s| s.settlement.clone())
            .filter(|s| Some(s.as_str()) != ambient);

        let mut segments = Vec::new();
        // Bare street names only count in scopes with no marked street.
        for scope in &scopes {
            if RE_STREET.is_match(scope.text) {
                self.segment_explicit_streets(scope, &mut segments);
            } else {
                self.segment_implicit_streets(scope, &mut segments);
            }
        }

        Segmentation {
            segments,
            last_settlement,
        }
    }

    fn segment_explicit_streets(&self, scope: &Scope<'_>, out: &mut Vec<AddressSegment>) {
        let text = scope.text;
        let matches: Vec<_> = RE_STREET.captures_iter(text).collect();

        for (i, caps) in matches.iter().enumerate() {
            let marker = caps["marker"].to_lowercase();
            let name = caps["name"].trim();
            let houses_start = caps.name("end").map(|m| m.start()).unwrap_or(text.len());
            let houses_end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(text.len());

            let street = format!("{marker} {name}");
            push_houses(out, &scope.settlement, &street, &text[houses_start..houses_end]);
        }
    }

    fn segment_implicit_streets(&self, scope: &Scope<'_>, out: &mut Vec<AddressSegment>) {
        for caps in RE_IMPLICIT_STREET.captures_iter(scope.text) {
            let name = caps["name"].trim();
            if name.chars().count() < 3 || self.denylist.matches(name) {
                continue;
            }
            push_houses(out, &scope.settlement, name, &caps["houses"]);
        }
    }
}

fn push_houses(
    out: &mut Vec<AddressSegment>,
    settlement: &Option<String>,
    street: &str,
    house_text: &str,
) {
    for house in expand_house_list(house_text) {
        out.push(AddressSegment {
            settlement: settlement.clone(),
            street: street.to_string(),
            house_token: house,
        });
    }
}

/// Cut the cell at every settlement marker. Text before the first marker
/// (or the whole cell, when there is none) falls under `ambient`.
fn split_settlement_scopes<'t>(text: &'t str, ambient: Option<&str>) -> Vec<Scope<'t>> {
    let mut starts = Vec::new();
    for caps in RE_SETTLEMENT.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if RE_TRAILING_STREET_MARKER.is_match(&text[..whole.start()]) {
            continue;
        }
        let marker = caps["marker"].to_lowercase();
        let name = caps["name"].trim();
        let body_start = caps.name("street").map(|m| m.start()).unwrap_or(whole.end());
        starts.push((whole.start(), body_start, format!("{marker}{name}")));
    }

    let ambient = ambient.map(str::to_string);
    if starts.is_empty() {
        return vec![Scope {
            settlement: ambient,
            text,
        }];
    }

    let mut scopes = Vec::with_capacity(starts.len() + 1);
    let preamble = &text[..starts[0].0];
    if !preamble.trim().is_empty() {
        scopes.push(Scope {
            settlement: ambient,
            text: preamble,
        });
    }
    for (i, (_, body_start, settlement)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map(|s| s.0).unwrap_or(text.len());
        scopes.push(Scope {
            settlement: Some(settlement.clone()),
            text: &text[*body_start..end],
        });
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples(seg: &Segmentation) -> Vec<(Option<&str>, &str, &str)> {
        seg.segments
            .iter()
            .map(|s| (s.settlement.as_deref(), s.street.as_str(), s.house_token.as_str()))
            .collect()
    }

    #[test]
    fn test_street_with_ambient_settlement() {
        let seg = AddressSegmenter::default()
            .segment("вул. Грабчака, 10, 12, 14-16", Some("м.Полтава"));
        let city = Some("м.Полтава");
        assert_eq!(
            triples(&seg),
            vec![
                (city, "вул. Грабчака", "10"),
                (city, "вул. Грабчака", "12"),
                (city, "вул. Грабчака", "14"),
                (city, "вул. Грабчака", "15"),
                (city, "вул. Грабчака", "16"),
            ]
        );
        assert_eq!(seg.last_settlement, None);
    }

    #[test]
    fn test_settlement_scopes() {
        let seg = AddressSegmenter::default().segment(
            "м.Полтава: вул. Садова, 1, 3; пров. Шкільний 7 с.Щербані вул. Миру, 2",
            None,
        );
        assert_eq!(
            triples(&seg),
            vec![
                (Some("м.Полтава"), "вул. Садова", "1"),
                (Some("м.Полтава"), "вул. Садова", "3"),
                (Some("м.Полтава"), "пров. Шкільний", "7"),
                (Some("с.Щербані"), "вул. Миру", "2"),
            ]
        );
        assert_eq!(seg.last_settlement.as_deref(), Some("с.Щербані"));
    }

    #[test]
    fn test_multi_word_settlement_and_marker_case() {
        let seg = AddressSegmenter::default().segment("М.Горішні плавні: Вул. Набережна, 5", None);
        assert_eq!(
            triples(&seg),
            vec![(Some("м.Горішні плавні"), "вул. Набережна", "5")]
        );
    }

    #[test]
    fn test_building_qualifier_in_brackets() {
        let seg = AddressSegmenter::default()
            .segment("вул. Баленка (б. 1, 3-4)", Some("м.Полтава"));
        let houses: Vec<_> = seg.segments.iter().map(|s| s.house_token.as_str()).collect();
        assert_eq!(houses, vec!["1", "3", "4"]);
    }

    #[test]
    fn test_whitespace_collapsed() {
        let seg = AddressSegmenter::default()
            .segment("вул.   Котляревського,\n 1/49,12,   8", None);
        assert_eq!(
            triples(&seg),
            vec![
                (None, "вул. Котляревського", "1/49"),
                (None, "вул. Котляревського", "12"),
                (None, "вул. Котляревського", "8"),
            ]
        );
    }

    #[test]
    fn test_implicit_street_fallback() {
        let seg = AddressSegmenter::default().segment("Залізна, 10, 12а", Some("м.Полтава"));
        assert_eq!(
            triples(&seg),
            vec![
                (Some("м.Полтава"), "Залізна", "10"),
                (Some("м.Полтава"), "Залізна", "12а"),
            ]
        );
    }

    #[test]
    fn test_company_is_not_a_street() {
        let seg = AddressSegmenter::default().segment("ТОВ Агросвіт 12", Some("м.Полтава"));
        assert!(seg.segments.is_empty());
    }

    #[test]
    fn test_settlement_only_cell() {
        let seg = AddressSegmenter::default().segment("с.Мачухи:", None);
        assert!(seg.segments.is_empty());
        assert_eq!(seg.last_settlement.as_deref(), Some("с.Мачухи"));
    }

    #[test]
    fn test_text_before_first_settlement_uses_ambient() {
        let seg = AddressSegmenter::default().segment(
            "вул. Садова, 1 с.Мачухи: вул. Миру, 2",
            Some("м.Полтава"),
        );
        assert_eq!(
            triples(&seg),
            vec![
                (Some("м.Полтава"), "вул. Садова", "1"),
                (Some("с.Мачухи"), "вул. Миру", "2"),
            ]
        );
    }

    #[test]
    fn test_initial_after_street_marker_is_not_a_settlement() {
        let seg = AddressSegmenter::default().segment("вул. М.Бірюзова, 5", Some("м.Полтава"));
        assert_eq!(seg.last_settlement, None);
        assert_eq!(
            triples(&seg),
            vec![(Some("м.Полтава"), "вул. М.Бірюзова", "5")]
        );
    }

    #[test]
    fn test_marked_street_without_houses_has_no_fallback() {
        let seg = AddressSegmenter::default().segment(
            "вул. Садова, гаражі Кооператив 12",
            Some("м.Полтава"),
        );
        assert!(seg.segments.is_empty());
    }

    #[test]
    fn test_comma_does_not_end_settlement_name() {
        let seg = AddressSegmenter::default().segment("с.Щербані Садова, 4", None);
        assert_eq!(seg.last_settlement, None);
        assert!(seg.segments.iter().all(|s| s.settlement.is_none()));
    }

    #[test]
    fn test_bracketed_house_list() {
        let seg = AddressSegmenter::default().segment("вул. Садова (1, 3)", Some("м.Полтава"));
        assert_eq!(
            triples(&seg),
            vec![
                (Some("м.Полтава"), "вул. Садова", "1"),
                (Some("м.Полтава"), "вул. Садова", "3"),
            ]
        );
    }

    #[test]
    fn test_no_address_at_all() {
        let seg = AddressSegmenter::default().segment("резервне живлення", None);
        assert_eq!(seg, Segmentation::default());
    }
}
