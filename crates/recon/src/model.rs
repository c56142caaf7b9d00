use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One access right: (system type, system, module, menu).
///
/// Field-wise equality; ordering is lexicographic over the four fields,
/// which is the order every report is sorted by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessTuple {
    pub system_type: String,
    pub system: String,
    pub module: String,
    pub menu: String,
}

impl AccessTuple {
    pub fn new(
        system_type: impl Into<String>,
        system: impl Into<String>,
        module: impl Into<String>,
        menu: impl Into<String>,
    ) -> Self {
        Self {
            system_type: system_type.into(),
            system: system.into(),
            module: module.into(),
            menu: menu.into(),
        }
    }

    /// Fields in column order, for tabular sinks.
    pub fn fields(&self) -> [&str; 4] {
        [&self.system_type, &self.system, &self.module, &self.menu]
    }
}

impl fmt::Display for AccessTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.system_type, self.system, self.module, self.menu
        )
    }
}

/// A raw (profile, access) row from the assignment table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessAssignment {
    pub profile: String,
    pub access: AccessTuple,
}

impl AccessAssignment {
    pub fn new(profile: impl Into<String>, access: AccessTuple) -> Self {
        Self { profile: profile.into(), access }
    }
}

/// A segregation-of-duties rule between two profiles.
///
/// The pair is unordered. A blank name on either side makes the rule
/// malformed; it is dropped when the conflict index is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictRule {
    pub profile_a: String,
    pub profile_b: String,
    pub reason: String,
}

impl ConflictRule {
    pub fn new(
        profile_a: impl Into<String>,
        profile_b: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            profile_a: profile_a.into(),
            profile_b: profile_b.into(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Which tuples get a row in the presence matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixScope {
    /// Every tuple of the global catalogue, including tuples no selected
    /// profile holds (rendered as all-absent rows).
    #[default]
    Catalogue,
    /// Only tuples held by at least one selected profile.
    Selection,
}

impl fmt::Display for MatrixScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalogue => write!(f, "catalogue"),
            Self::Selection => write!(f, "selection"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ReconOptions {
    #[serde(default)]
    pub matrix_scope: MatrixScope,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub profile: String,
    pub total: usize,
    pub exclusive: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusiveSet {
    pub profile: String,
    pub access: Vec<AccessTuple>,
}

/// One presence-matrix row. `present` is parallel to the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub access: AccessTuple,
    pub present: Vec<bool>,
    pub conflict: bool,
    pub conflict_pairs: String,
}

/// One (tuple, conflicting pair) finding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ConflictDetail {
    pub profile_1: String,
    pub profile_2: String,
    pub access: AccessTuple,
    pub reason: String,
}

/// Counts of conflict rules that did not take part in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleDiagnostics {
    pub total_rules: usize,
    pub malformed: usize,
    pub self_pairs: usize,
    pub outside_selection: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub selected: Vec<String>,
    pub matrix_scope: MatrixScope,
    pub profiles: Vec<ProfileSummary>,
    pub common: Vec<AccessTuple>,
    pub exclusive: Vec<ExclusiveSet>,
    pub matrix: Vec<MatrixRow>,
    pub conflicts: Vec<ConflictDetail>,
    pub rules: RuleDiagnostics,
}

impl AnalysisResult {
    pub fn exclusive_of(&self, profile: &str) -> Option<&[AccessTuple]> {
        self.exclusive
            .iter()
            .find(|e| e.profile == profile)
            .map(|e| e.access.as_slice())
    }

    pub fn matrix_row(&self, access: &AccessTuple) -> Option<&MatrixRow> {
        self.matrix.iter().find(|r| &r.access == access)
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}
