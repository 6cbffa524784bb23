use regex::Regex;
use std::sync::LazyLock;

/// Widest range `a-b` that is still expanded. Anything wider is almost
/// certainly two numbers glued together by a misread separator.
pub const MAX_RANGE_SPAN: u32 = 100;

// "45-64", "32- 56", "32 -56"
static RE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*-\s*(\d+)$").unwrap());

// Qualifiers in front of house lists: "(б. 1, 2)", "буд. 4", "б.7"
static RE_BUILDING_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\(\s*|\b)(?:буд|б)\.\s*").unwrap());

static RE_TOKEN_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;]\s*").unwrap());

const EDGE_PUNCTUATION: &[char] = &[',', ';', '.', ':', ' '];

/// Expand a single house token into discrete house identifiers.
///
/// `"14-16"` → `["14", "15", "16"]`, `"10а"` → `["10а"]`, `"1-500"` →
/// `["1-500"]`, `"корп"` → `[]`. Never fails.
pub fn expand_house_token(token: &str) -> Vec<String> {
    let token = token.trim().trim_end_matches(EDGE_PUNCTUATION);
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return Vec::new();
    }

    if let Some(caps) = RE_RANGE.captures(token) {
        let bounds = caps[1].parse::<u32>().ok().zip(caps[2].parse::<u32>().ok());
        if let Some((start, end)) = bounds {
            if end >= start && end - start <= MAX_RANGE_SPAN {
                return (start..=end).map(|n| n.to_string()).collect();
            }
        }
    }

    vec![token.to_string()]
}

/// Strip building qualifiers, brackets and edge punctuation from the text
/// that follows a street name.
pub fn clean_house_list(text: &str) -> String {
    let without_qualifiers = RE_BUILDING_QUALIFIER.replace_all(text, "");
    without_qualifiers
        .replace(|c: char| c == '(' || c == ')', "")
        .trim_matches(EDGE_PUNCTUATION)
        .to_string()
}

/// Split a cleaned house list on commas/semicolons and expand every token.
///
/// `"10, 12, 14-16, 18а"` → `["10", "12", "14", "15", "16", "18а"]`
pub fn expand_house_list(text: &str) -> Vec<String> {
    let cleaned = clean_house_list(text);
    RE_TOKEN_SEPARATOR
        .split(&cleaned)
        .flat_map(expand_house_token)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_expands_inclusive() {
        assert_eq!(expand_house_token("14-16"), vec!["14", "15", "16"]);
        assert_eq!(expand_house_token("32- 56").len(), 25);
    }

    #[test]
    fn test_range_length_matches_span() {
        for (a, b) in [(1u32, 1u32), (5, 9), (10, 110), (0, 100)] {
            let houses = expand_house_token(&format!("{a}-{b}"));
            assert_eq!(houses.len() as u32, b - a + 1);
            assert_eq!(houses.first().unwrap(), &a.to_string());
            assert_eq!(houses.last().unwrap(), &b.to_string());
        }
    }

    #[test]
    fn test_oversized_range_passes_through() {
        assert_eq!(expand_house_token("1-102"), vec!["1-102"]);
        assert_eq!(expand_house_token("7-3"), vec!["7-3"]);
    }

    #[test]
    fn test_single_houses_keep_suffixes() {
        assert_eq!(expand_house_token("10а"), vec!["10а"]);
        assert_eq!(expand_house_token("1/49"), vec!["1/49"]);
        assert_eq!(expand_house_token(" 18б. "), vec!["18б"]);
    }

    #[test]
    fn test_non_numeric_tokens_dropped() {
        assert!(expand_house_token("").is_empty());
        assert!(expand_house_token("корпус 2").is_empty());
        assert!(expand_house_token("-5").is_empty());
    }

    #[test]
    fn test_house_list_with_qualifier() {
        assert_eq!(
            expand_house_list(", (б. 1, 2, 3-4);"),
            vec!["1", "2", "3", "4"]
        );
        assert_eq!(expand_house_list("буд. 7, 9а"), vec!["7", "9а"]);
    }

    #[test]
    fn test_bare_brackets_stripped() {
        assert_eq!(expand_house_list(" (1, 3)"), vec!["1", "3"]);
        assert_eq!(expand_house_list("(5-6)"), vec!["5", "6"]);
    }

    #[test]
    fn test_letter_suffix_b_is_not_a_qualifier() {
        assert_eq!(expand_house_list("10б, 12"), vec!["10б", "12"]);
    }
}
