use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ExtractError;
use crate::reconcile::is_well_formed_settlement;

pub const DEFAULT_LOOKBACK: usize = 150;
pub const DEFAULT_MIN_CELL_CHARS: usize = 5;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Static configuration for one extraction pass. Loaded once, never
/// mutated while rows are processed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractConfig {
    /// Ambient settlement before any row names one.
    #[serde(default)]
    pub default_settlement: Option<String>,
    /// Only keep rows from these branches; empty keeps all.
    #[serde(default)]
    pub include_branches: Vec<String>,
    /// Address cells shorter than this (in chars) are logged as too short.
    #[serde(default = "default_min_cell_chars")]
    pub min_cell_chars: usize,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub organizations: OrganizationDenylist,
}

fn default_min_cell_chars() -> usize {
    DEFAULT_MIN_CELL_CHARS
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            default_settlement: None,
            include_branches: Vec::new(),
            min_cell_chars: DEFAULT_MIN_CELL_CHARS,
            reconcile: ReconcileConfig::default(),
            organizations: OrganizationDenylist::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// `(short settlement, street, branch) → corrected settlement`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverrideRule {
    pub settlement: String,
    pub street: String,
    pub branch: String,
    pub corrected: String,
}

impl OverrideRule {
    fn new(settlement: &str, street: &str, branch: &str, corrected: &str) -> Self {
        OverrideRule {
            settlement: settlement.to_string(),
            street: street.to_string(),
            branch: branch.to_string(),
            corrected: corrected.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    /// How many already-reconciled records to look back through.
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// Replaces the built-in table when present.
    #[serde(default = "builtin_overrides", rename = "override")]
    pub overrides: Vec<OverrideRule>,
}

fn default_lookback() -> usize {
    DEFAULT_LOOKBACK
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            lookback: DEFAULT_LOOKBACK,
            overrides: builtin_overrides(),
        }
    }
}

impl ReconcileConfig {
    /// Override table keyed by `(settlement, street, branch)`.
    pub fn override_table(&self) -> HashMap<(String, String, String), String> {
        self.overrides
            .iter()
            .map(|r| {
                (
                    (r.settlement.clone(), r.street.clone(), r.branch.clone()),
                    r.corrected.clone(),
                )
            })
            .collect()
    }
}

/// Truncated names seen in the Kremenchuk branch pages, resolved by hand
/// from the streets they appear with.
pub fn builtin_overrides() -> Vec<OverrideRule> {
    const KREMENCHUK: &str = "Кременчуцька";
    const HORISHNI_PLAVNI: &str = "м.Горішні плавні";
    vec![
        OverrideRule::new("м.І", "вул. Набережна", KREMENCHUK, HORISHNI_PLAVNI),
        OverrideRule::new("м.І", "вул. Портова", KREMENCHUK, HORISHNI_PLAVNI),
        OverrideRule::new("м.І", "вул. Строни", KREMENCHUK, HORISHNI_PLAVNI),
        OverrideRule::new("м.В", "вул. Набережна", KREMENCHUK, HORISHNI_PLAVNI),
        OverrideRule::new("м.М", "вул. Строни", KREMENCHUK, HORISHNI_PLAVNI),
        OverrideRule::new("с.М", "вул. Строни", KREMENCHUK, HORISHNI_PLAVNI),
        OverrideRule::new("м.А", "вул. Троїцька", KREMENCHUK, "м.Кременчук"),
    ]
}

// ---------------------------------------------------------------------------
// Organization denylist
// ---------------------------------------------------------------------------

/// Words that mark a capitalized phrase as a company name rather than a
/// street without a marker.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationDenylist {
    /// Matched against whole words, case-insensitively ("ТОВ", "ПАТ").
    pub abbreviations: Vec<String>,
    /// Matched against word prefixes, case-insensitively ("завод").
    pub stems: Vec<String>,
}

impl Default for OrganizationDenylist {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        OrganizationDenylist {
            abbreviations: owned(&["ТОВ", "ПАТ", "ПрАТ", "АТ", "ВАТ", "КП", "ПП", "ДП", "ФОП"]),
            stems: owned(&["філі", "завод", "комбінат", "підприєм", "компані"]),
        }
    }
}

impl OrganizationDenylist {
    pub fn matches(&self, phrase: &str) -> bool {
        phrase
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .any(|word| {
                self.abbreviations.iter().any(|a| a.to_lowercase() == word)
                    || self.stems.iter().any(|s| word.starts_with(&s.to_lowercase()))
            })
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ExtractConfig {
    pub fn from_toml(input: &str) -> Result<Self, ExtractError> {
        let config: ExtractConfig =
            toml::from_str(input).map_err(|e| ExtractError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        let input = std::fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.reconcile.lookback == 0 {
            return Err(ExtractError::ConfigValidation(
                "reconcile.lookback must be at least 1".into(),
            ));
        }

        // A correction that is itself truncated would be re-flagged on the
        // next pass.
        for rule in &self.reconcile.overrides {
            if !is_well_formed_settlement(Some(&rule.corrected)) {
                return Err(ExtractError::ConfigValidation(format!(
                    "override for ({}, {}, {}) corrects to '{}', which is not a full settlement name",
                    rule.settlement, rule.street, rule.branch, rule.corrected
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for rule in &self.reconcile.overrides {
            if !seen.insert((&rule.settlement, &rule.street, &rule.branch)) {
                return Err(ExtractError::ConfigValidation(format!(
                    "duplicate override for ({}, {}, {})",
                    rule.settlement, rule.street, rule.branch
                )));
            }
        }

        if let Some(s) = &self.default_settlement {
            if !is_well_formed_settlement(Some(s)) {
                return Err(ExtractError::ConfigValidation(format!(
                    "default_settlement '{s}' is not a full settlement name"
                )));
            }
        }

        Ok(())
    }

    pub fn keeps_branch(&self, branch: Option<&str>) -> bool {
        self.include_branches.is_empty()
            || branch.is_some_and(|b| self.include_branches.iter().any(|i| i == b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = ExtractConfig::from_toml("").unwrap();
        assert_eq!(config.reconcile.lookback, DEFAULT_LOOKBACK);
        assert_eq!(config.min_cell_chars, DEFAULT_MIN_CELL_CHARS);
        assert_eq!(config.reconcile.overrides, builtin_overrides());
    }

    #[test]
    fn test_override_table_from_toml() {
        let config = ExtractConfig::from_toml(
            r#"
default_settlement = "м.Полтава"

[reconcile]
lookback = 50

[[reconcile.override]]
settlement = "с.В"
street = "вул. Миру"
branch = "Кременчуцька"
corrected = "с.Велика Кохнівка"
"#,
        )
        .unwrap();
        assert_eq!(config.reconcile.lookback, 50);
        let table = config.reconcile.override_table();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get(&("с.В".into(), "вул. Миру".into(), "Кременчуцька".into())),
            Some(&"с.Велика Кохнівка".to_string())
        );
    }

    #[test]
    fn test_truncated_correction_rejected() {
        let err = ExtractConfig::from_toml(
            r#"
[[reconcile.override]]
settlement = "м.І"
street = "вул. Набережна"
branch = "Кременчуцька"
corrected = "м.Го"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::ConfigValidation(_)));
    }

    #[test]
    fn test_zero_lookback_rejected() {
        let err = ExtractConfig::from_toml("[reconcile]\nlookback = 0\n").unwrap_err();
        assert!(matches!(err, ExtractError::ConfigValidation(_)));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = ExtractConfig::from_toml("lookbak = 3\n").unwrap_err();
        assert!(matches!(err, ExtractError::ConfigParse(_)));
    }

    #[test]
    fn test_organization_denylist() {
        let deny = OrganizationDenylist::default();
        assert!(deny.matches("ТОВ Агросвіт"));
        assert!(deny.matches("Полтавський турбомеханічний завод"));
        assert!(deny.matches("Філія Кременчуцька"));
        assert!(!deny.matches("Товарна"));
        assert!(!deny.matches("Грабчака"));
    }

    #[test]
    fn test_branch_filter() {
        let mut config = ExtractConfig::default();
        assert!(config.keeps_branch(None));
        config.include_branches = vec!["Полтавська".into()];
        assert!(config.keeps_branch(Some("Полтавська")));
        assert!(!config.keeps_branch(Some("Лубенська")));
        assert!(!config.keeps_branch(None));
    }
}
