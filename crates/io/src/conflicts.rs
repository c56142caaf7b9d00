// Conflict table: located by a marker header row ("PERFIL I" / "PERFIL II")

use serde::{Deserialize, Serialize};

use accessgrid_recon::model::ConflictRule;

use crate::table::cell;

/// Header cells that mark where the conflict table begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictMarkers {
    pub profile_a: String,
    pub profile_b: String,
    /// Preferred reason column; falls back to the first other header cell.
    pub reason: String,
}

impl Default for ConflictMarkers {
    fn default() -> Self {
        Self {
            profile_a: "PERFIL I".into(),
            profile_b: "PERFIL II".into(),
            reason: "MOTIVO".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictTable {
    pub source: String,
    /// Every data row, malformed ones included; the engine drops those.
    pub rules: Vec<ConflictRule>,
    /// Rows with a blank profile cell.
    pub malformed_rows: usize,
}

/// Index of the first row holding both profile markers.
pub fn find_marker_row(rows: &[Vec<String>], markers: &ConflictMarkers) -> Option<usize> {
    rows.iter().position(|row| marker_columns(row, markers).is_some())
}

/// Columns of the two profile markers in `row`.
pub(crate) fn marker_columns(row: &[String], markers: &ConflictMarkers) -> Option<(usize, usize)> {
    let a = row.iter().position(|c| *c == markers.profile_a)?;
    let b = row.iter().position(|c| *c == markers.profile_b)?;
    Some((a, b))
}

/// Read conflict rules below the marker row at `header_idx`, stopping at
/// the first row whose conflict cells are all blank. Cells outside the
/// conflict columns are ignored, so the table may sit beside other data.
pub fn extract_conflicts(
    source: &str,
    rows: &[Vec<String>],
    header_idx: usize,
    markers: &ConflictMarkers,
) -> ConflictTable {
    let empty = || ConflictTable { source: source.to_string(), ..ConflictTable::default() };
    let Some(header) = rows.get(header_idx) else {
        return empty();
    };
    let Some((col_a, col_b)) = marker_columns(header, markers) else {
        return empty();
    };

    let col_reason = header.iter().position(|h| *h == markers.reason).or_else(|| {
        header
            .iter()
            .enumerate()
            .position(|(i, h)| i != col_a && i != col_b && !h.is_empty())
    });
    if col_reason.is_none() {
        log::warn!("{source}: conflict table has no reason column");
    }

    let columns: Vec<usize> = [Some(col_a), Some(col_b), col_reason].into_iter().flatten().collect();
    let mut table = empty();
    for row in rows[header_idx + 1..]
        .iter()
        .take_while(|r| columns.iter().any(|&c| !cell(r, c).is_empty()))
    {
        let rule = ConflictRule::new(
            cell(row, col_a),
            cell(row, col_b),
            col_reason.map(|c| cell(row, c)).unwrap_or(""),
        );
        if rule.profile_a.is_empty() || rule.profile_b.is_empty() {
            table.malformed_rows += 1;
        }
        table.rules.push(rule);
    }

    if table.malformed_rows > 0 {
        log::warn!(
            "{source}: {} conflict row(s) missing a profile name",
            table.malformed_rows
        );
    }

    table
}
