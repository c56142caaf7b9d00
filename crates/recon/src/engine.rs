use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::conflict::ConflictIndex;
use crate::error::ReconError;
use crate::index::AccessIndex;
use crate::model::{
    AccessTuple, AnalysisResult, ConflictDetail, ConflictRule, ExclusiveSet, MatrixRow,
    MatrixScope, ProfileSummary, ReconOptions,
};

/// Shared flag checked between the major reconciliation steps.
pub type CancelToken = Arc<AtomicBool>;

/// Joins the two profiles of a conflicting pair in a matrix description.
pub const PAIR_LABEL_SEPARATOR: &str = " x ";

/// Joins the pair labels of one matrix row.
pub const DESCRIPTION_SEPARATOR: &str = ";";

/// Reconcile `selected` profiles against the raw conflict rules.
pub fn run<S: AsRef<str>>(
    index: &AccessIndex,
    rules: &[ConflictRule],
    selected: &[S],
    options: &ReconOptions,
) -> Result<AnalysisResult, ReconError> {
    run_indexed(index, &ConflictIndex::build(rules), selected, options, None)
}

/// Like [`run`], with a prebuilt conflict index and an optional cancel token.
///
/// A set token aborts with [`ReconError::Cancelled`]; no partial result is
/// returned.
pub fn run_indexed<S: AsRef<str>>(
    index: &AccessIndex,
    conflicts: &ConflictIndex,
    selected: &[S],
    options: &ReconOptions,
    cancel: Option<&CancelToken>,
) -> Result<AnalysisResult, ReconError> {
    let selected = validate_selection(index, selected)?;
    let empty = BTreeSet::new();
    let sets: Vec<&BTreeSet<AccessTuple>> = selected
        .iter()
        .map(|p| index.access_of(p).unwrap_or(&empty))
        .collect();

    // Common + exclusive
    let common: Vec<AccessTuple> = sets[0]
        .iter()
        .filter(|t| sets[1..].iter().all(|s| s.contains(*t)))
        .cloned()
        .collect();

    let exclusive: Vec<ExclusiveSet> = selected
        .iter()
        .enumerate()
        .map(|(i, profile)| ExclusiveSet {
            profile: profile.to_string(),
            access: sets[i]
                .iter()
                .filter(|t| {
                    sets.iter()
                        .enumerate()
                        .all(|(j, other)| j == i || !other.contains(*t))
                })
                .cloned()
                .collect(),
        })
        .collect();

    check_cancel(cancel)?;

    // Conflict cross-reference
    let restricted = conflicts.restrict_to(&selected);
    let (details, labels) = if restricted.is_empty() {
        (Vec::new(), BTreeMap::new())
    } else {
        find_conflicts(index, &restricted, &selected)
    };

    check_cancel(cancel)?;

    // Presence matrix
    let rows: Vec<&AccessTuple> = match options.matrix_scope {
        MatrixScope::Catalogue => {
            let mut all: Vec<&AccessTuple> = index.catalogue().iter().collect();
            all.sort();
            all
        }
        MatrixScope::Selection => {
            let union: BTreeSet<&AccessTuple> = sets.iter().flat_map(|s| s.iter()).collect();
            union.into_iter().collect()
        }
    };

    let matrix: Vec<MatrixRow> = rows
        .into_iter()
        .map(|access| {
            let pair_labels = labels.get(access);
            MatrixRow {
                access: access.clone(),
                present: sets.iter().map(|s| s.contains(access)).collect(),
                conflict: pair_labels.is_some(),
                conflict_pairs: pair_labels
                    .map(|l| l.iter().map(String::as_str).collect::<Vec<_>>().join(DESCRIPTION_SEPARATOR))
                    .unwrap_or_default(),
            }
        })
        .collect();

    let profiles = selected
        .iter()
        .zip(&sets)
        .zip(&exclusive)
        .map(|((profile, set), excl)| ProfileSummary {
            profile: profile.to_string(),
            total: set.len(),
            exclusive: excl.access.len(),
        })
        .collect();

    log::debug!(
        "reconciled {} profile(s): {} common, {} matrix rows, {} conflict row(s)",
        selected.len(),
        common.len(),
        matrix.len(),
        details.len()
    );

    Ok(AnalysisResult {
        selected: selected.iter().map(|p| p.to_string()).collect(),
        matrix_scope: options.matrix_scope,
        profiles,
        common,
        exclusive,
        matrix,
        conflicts: details,
        rules: restricted.diagnostics(),
    })
}

/// Check the selection before any work: at least two profiles, no
/// repeats, every one present in the index.
pub fn validate_selection<'a, S: AsRef<str>>(
    index: &AccessIndex,
    selected: &'a [S],
) -> Result<Vec<&'a str>, ReconError> {
    if selected.len() < 2 {
        return Err(ReconError::TooFewProfiles { selected: selected.len() });
    }

    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(selected.len());
    for profile in selected {
        let profile = profile.as_ref();
        if !seen.insert(profile) {
            return Err(ReconError::DuplicateProfile(profile.to_string()));
        }
        if !index.contains_profile(profile) {
            return Err(ReconError::UnknownProfile(profile.to_string()));
        }
        names.push(profile);
    }
    Ok(names)
}

type PairLabels<'a> = BTreeMap<&'a AccessTuple, BTreeSet<String>>;

/// Walk every catalogue tuple, pair up its selected owners, and keep the
/// pairs the restricted index knows about.
fn find_conflicts<'a>(
    index: &'a AccessIndex,
    conflicts: &ConflictIndex,
    selected: &[&str],
) -> (Vec<ConflictDetail>, PairLabels<'a>) {
    let mut details = Vec::new();
    let mut labels: PairLabels<'a> = BTreeMap::new();

    for access in index.catalogue() {
        let Some(owners) = index.owners_of(access) else {
            continue;
        };
        // Selection order, so pair labels read the way the caller listed them.
        let holders: Vec<&str> = selected
            .iter()
            .copied()
            .filter(|p| owners.contains(*p))
            .collect();
        if holders.len() < 2 {
            continue;
        }

        for (i, first) in holders.iter().enumerate() {
            for second in &holders[i + 1..] {
                let Some(reason) = conflicts.joined_reasons(first, second) else {
                    continue;
                };
                labels
                    .entry(access)
                    .or_default()
                    .insert(format!("{first}{PAIR_LABEL_SEPARATOR}{second}"));
                details.push(ConflictDetail {
                    profile_1: first.to_string(),
                    profile_2: second.to_string(),
                    access: access.clone(),
                    reason,
                });
            }
        }
    }

    details.sort();
    (details, labels)
}

fn check_cancel(cancel: Option<&CancelToken>) -> Result<(), ReconError> {
    match cancel {
        Some(token) if token.load(Ordering::Relaxed) => Err(ReconError::Cancelled),
        _ => Ok(()),
    }
}
