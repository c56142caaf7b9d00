//! Conflict catalogue keyed by unordered profile pair.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ConflictRule, RuleDiagnostics};

/// Separator between reasons attached to the same pair.
pub const REASON_SEPARATOR: &str = "|";

/// Normalized key for an unordered pair: the two names, sorted.
pub type PairKey = (String, String);

pub fn pair_key(a: &str, b: &str) -> PairKey {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Unordered pair → every reason recorded for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictIndex {
    pairs: BTreeMap<PairKey, BTreeSet<String>>,
    diagnostics: RuleDiagnostics,
}

impl ConflictIndex {
    /// Build from raw rules. Malformed rules (blank name) and self pairs
    /// are dropped and counted.
    pub fn build(rules: &[ConflictRule]) -> Self {
        let mut pairs: BTreeMap<PairKey, BTreeSet<String>> = BTreeMap::new();
        let mut diagnostics = RuleDiagnostics {
            total_rules: rules.len(),
            ..RuleDiagnostics::default()
        };

        for rule in rules {
            let (a, b) = (rule.profile_a.as_str(), rule.profile_b.as_str());
            if a.trim().is_empty() || b.trim().is_empty() {
                diagnostics.malformed += 1;
                continue;
            }
            if a == b {
                diagnostics.self_pairs += 1;
                continue;
            }
            pairs
                .entry(pair_key(a, b))
                .or_default()
                .insert(rule.reason.clone());
        }

        if diagnostics.malformed > 0 || diagnostics.self_pairs > 0 {
            log::warn!(
                "conflict rules: dropped {} malformed and {} self-pair rule(s) of {}",
                diagnostics.malformed,
                diagnostics.self_pairs,
                diagnostics.total_rules
            );
        }

        Self { pairs, diagnostics }
    }

    /// Keep only pairs whose two members are both in `selection`.
    pub fn restrict_to<S: AsRef<str>>(&self, selection: &[S]) -> Self {
        let selected: BTreeSet<&str> = selection.iter().map(|s| s.as_ref()).collect();
        let mut restricted = BTreeMap::new();
        let mut outside = 0;

        for (key, reasons) in &self.pairs {
            if selected.contains(key.0.as_str()) && selected.contains(key.1.as_str()) {
                restricted.insert(key.clone(), reasons.clone());
            } else {
                outside += 1;
            }
        }

        Self {
            pairs: restricted,
            diagnostics: RuleDiagnostics {
                outside_selection: outside,
                ..self.diagnostics
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn diagnostics(&self) -> RuleDiagnostics {
        self.diagnostics
    }

    pub fn is_conflicting(&self, a: &str, b: &str) -> bool {
        self.pairs.contains_key(&pair_key(a, b))
    }

    pub fn reasons(&self, a: &str, b: &str) -> Option<&BTreeSet<String>> {
        self.pairs.get(&pair_key(a, b))
    }

    /// Sorted union of the pair's reasons, joined for display.
    pub fn joined_reasons(&self, a: &str, b: &str) -> Option<String> {
        self.reasons(a, b).map(|set| {
            set.iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(REASON_SEPARATOR)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(pair_key("Finance", "Audit"), pair_key("Audit", "Finance"));
        assert_eq!(pair_key("Finance", "Audit"), ("Audit".into(), "Finance".into()));
    }

    #[test]
    fn reasons_of_same_pair_accumulate() {
        let index = ConflictIndex::build(&[
            ConflictRule::new("Finance", "Audit", "SoD violation"),
            ConflictRule::new("Audit", "Finance", "Approve own postings"),
            ConflictRule::new("Finance", "Audit", "SoD violation"),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.joined_reasons("Finance", "Audit").unwrap(),
            "Approve own postings|SoD violation"
        );
        assert_eq!(
            index.joined_reasons("Audit", "Finance"),
            index.joined_reasons("Finance", "Audit")
        );
    }

    #[test]
    fn malformed_and_self_pairs_are_counted_not_indexed() {
        let index = ConflictIndex::build(&[
            ConflictRule::new("", "Audit", "missing left"),
            ConflictRule::new("Finance", "  ", "missing right"),
            ConflictRule::new("Ops", "Ops", "self"),
            ConflictRule::new("Ops", "Audit", "ok"),
        ]);
        let diag = index.diagnostics();
        assert_eq!(diag.total_rules, 4);
        assert_eq!(diag.malformed, 2);
        assert_eq!(diag.self_pairs, 1);
        assert_eq!(index.len(), 1);
        assert!(index.is_conflicting("Audit", "Ops"));
        assert!(!index.is_conflicting("Ops", "Ops"));
    }

    #[test]
    fn restriction_drops_pairs_with_unselected_member() {
        let index = ConflictIndex::build(&[
            ConflictRule::new("Finance", "Audit", "a"),
            ConflictRule::new("Finance", "Ops", "b"),
        ]);
        let restricted = index.restrict_to(&["Finance", "Audit"]);
        assert_eq!(restricted.len(), 1);
        assert!(restricted.is_conflicting("Audit", "Finance"));
        assert!(!restricted.is_conflicting("Finance", "Ops"));
        assert_eq!(restricted.diagnostics().outside_selection, 1);
    }

    #[test]
    fn names_compare_exactly() {
        let index = ConflictIndex::build(&[ConflictRule::new("Finance ", "Audit", "x")]);
        assert!(index.is_conflicting("Finance ", "Audit"));
        assert!(!index.is_conflicting("Finance", "Audit"));
    }
}
