use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{AccessTuple, AnalysisResult};

/// Headline counts for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub selected_profiles: usize,
    pub matrix_rows: usize,
    /// Distinct tuples held by at least one selected profile.
    pub union: usize,
    pub common: usize,
    /// Held by more than one but not every selected profile.
    pub shared_partial: usize,
    pub exclusive: usize,
    pub flagged_tuples: usize,
    pub conflict_rows: usize,
    pub conflicting_pairs: usize,
}

/// Compute summary statistics from an analysis result.
pub fn compute_summary(result: &AnalysisResult) -> ReconSummary {
    let union = result
        .matrix
        .iter()
        .filter(|r| r.present.iter().any(|p| *p))
        .count();
    let exclusive: usize = result.exclusive.iter().map(|e| e.access.len()).sum();
    let pairs: BTreeSet<(&str, &str)> = result
        .conflicts
        .iter()
        .map(|c| (c.profile_1.as_str(), c.profile_2.as_str()))
        .collect();
    let flagged: BTreeSet<&AccessTuple> = result.conflicts.iter().map(|c| &c.access).collect();

    ReconSummary {
        selected_profiles: result.selected.len(),
        matrix_rows: result.matrix.len(),
        union,
        common: result.common.len(),
        shared_partial: union.saturating_sub(result.common.len() + exclusive),
        exclusive,
        flagged_tuples: flagged.len(),
        conflict_rows: result.conflicts.len(),
        conflicting_pairs: pairs.len(),
    }
}
