// Access assignment table: header detection, required columns, row cleanup

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use accessgrid_recon::model::{AccessAssignment, AccessTuple};

use crate::error::LoadError;
use crate::table::{cell, is_blank_row};

/// Header names of the five required assignment columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentColumns {
    pub profile: String,
    pub system_type: String,
    pub system: String,
    pub module: String,
    pub menu: String,
}

impl Default for AssignmentColumns {
    fn default() -> Self {
        Self {
            profile: "Grupo".into(),
            system_type: "Tp.Sistema".into(),
            system: "Sistema".into(),
            module: "Módulo".into(),
            menu: "Menu".into(),
        }
    }
}

impl AssignmentColumns {
    fn names(&self) -> [&str; 5] {
        [&self.profile, &self.system_type, &self.system, &self.module, &self.menu]
    }
}

/// Loaded assignment rows plus what was dropped on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentTable {
    pub source: String,
    pub assignments: Vec<AccessAssignment>,
    /// Rows with at least one blank required cell.
    pub skipped_rows: usize,
    /// Rows identical to an earlier row.
    pub duplicate_rows: usize,
}

/// Index of the first row naming every required column, or `None`.
pub fn find_header_row(rows: &[Vec<String>], columns: &AssignmentColumns) -> Option<usize> {
    let names = columns.names();
    rows.iter()
        .position(|row| names.iter().all(|n| row.iter().any(|c| c == n)))
}

/// Leftmost through rightmost required column of `header`.
pub(crate) fn column_span(header: &[String], columns: &AssignmentColumns) -> RangeInclusive<usize> {
    let positions: Vec<usize> = columns
        .names()
        .iter()
        .filter_map(|n| header.iter().position(|h| h == n))
        .collect();
    let first = positions.iter().copied().min().unwrap_or(0);
    let last = positions.iter().copied().max().unwrap_or(0);
    first..=last
}

/// Extract assignments from `rows`. The header is the first row naming all
/// required columns; every later non-blank row is data.
pub fn extract_assignments(
    source: &str,
    rows: &[Vec<String>],
    columns: &AssignmentColumns,
) -> Result<AssignmentTable, LoadError> {
    let Some(header_idx) = find_header_row(rows, columns) else {
        return Err(LoadError::MissingColumns {
            table: source.to_string(),
            columns: missing_columns(rows, columns),
        });
    };

    let header = &rows[header_idx];
    let idx = |name: &str| header.iter().position(|h| h == name).unwrap_or(usize::MAX);
    let [profile, system_type, system, module, menu] = columns.names().map(idx);

    let mut seen = HashSet::new();
    let mut table = AssignmentTable {
        source: source.to_string(),
        ..AssignmentTable::default()
    };

    for row in &rows[header_idx + 1..] {
        let fields = [
            cell(row, profile),
            cell(row, system_type),
            cell(row, system),
            cell(row, module),
            cell(row, menu),
        ];
        // Nothing in the required columns: a spacer, or a row of a table beside this one
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        if fields.iter().any(|f| f.is_empty()) {
            table.skipped_rows += 1;
            continue;
        }
        let assignment = AccessAssignment::new(
            fields[0],
            AccessTuple::new(fields[1], fields[2], fields[3], fields[4]),
        );
        if seen.insert(assignment.clone()) {
            table.assignments.push(assignment);
        } else {
            table.duplicate_rows += 1;
        }
    }

    if table.skipped_rows > 0 {
        log::warn!(
            "{source}: skipped {} row(s) with a blank required column",
            table.skipped_rows
        );
    }
    log::debug!(
        "{source}: {} assignment(s), {} duplicate row(s) dropped",
        table.assignments.len(),
        table.duplicate_rows
    );

    Ok(table)
}

/// Required columns absent from the first non-blank row, which is what a
/// reader would take for the header.
fn missing_columns(rows: &[Vec<String>], columns: &AssignmentColumns) -> Vec<String> {
    let header = rows.iter().find(|r| !is_blank_row(r));
    columns
        .names()
        .iter()
        .filter(|n| header.map_or(true, |h| !h.iter().any(|c| c == *n)))
        .map(|n| n.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|l| l.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    const HEADER: &[&str] = &["Grupo", "Tp.Sistema", "Sistema", "Módulo", "Menu"];

    #[test]
    fn extracts_rows_under_header() {
        let data = rows(&[
            HEADER,
            &["Finance", "ERP", "SAP", "GL", "Post Entry"],
            &["Audit", "ERP", "SAP", "GL", "Post Entry"],
        ]);
        let table = extract_assignments("base", &data, &AssignmentColumns::default()).unwrap();
        assert_eq!(table.assignments.len(), 2);
        assert_eq!(table.assignments[1].profile, "Audit");
        assert_eq!(table.assignments[1].access.menu, "Post Entry");
    }

    #[test]
    fn header_may_sit_below_a_title_and_columns_may_be_reordered() {
        let data = rows(&[
            &["Relatório de acessos"],
            &[],
            &["Menu", "Extra", "Grupo", "Sistema", "Tp.Sistema", "Módulo"],
            &["Post Entry", "x", "Finance", "SAP", "ERP", "GL"],
        ]);
        let table = extract_assignments("base", &data, &AssignmentColumns::default()).unwrap();
        assert_eq!(table.assignments.len(), 1);
        let a = &table.assignments[0];
        assert_eq!(a.profile, "Finance");
        assert_eq!(a.access, AccessTuple::new("ERP", "SAP", "GL", "Post Entry"));
    }

    #[test]
    fn blank_required_cells_skip_row_and_duplicates_collapse() {
        let data = rows(&[
            HEADER,
            &["Finance", "ERP", "SAP", "GL", "Post Entry"],
            &["Finance", "ERP", "SAP", "", "Post Entry"],
            &["Finance", "ERP", "SAP", "GL", "Post Entry"],
            &["", "", "", "", ""],
            &["Audit", "ERP", "SAP", "GL"],
            &["", "", "", "", "", "side note"],
        ]);
        let table = extract_assignments("base", &data, &AssignmentColumns::default()).unwrap();
        assert_eq!(table.assignments.len(), 1);
        assert_eq!(table.skipped_rows, 2);
        assert_eq!(table.duplicate_rows, 1);
    }

    #[test]
    fn missing_columns_are_listed() {
        let data = rows(&[&["Grupo", "Sistema", "Menu"], &["Finance", "SAP", "Post"]]);
        let err = extract_assignments("base", &data, &AssignmentColumns::default()).unwrap_err();
        assert!(err.is_schema_missing());
        assert_eq!(
            err,
            LoadError::MissingColumns {
                table: "base".into(),
                columns: vec!["Tp.Sistema".into(), "Módulo".into()],
            }
        );
    }

    #[test]
    fn span_covers_required_columns_only() {
        let header: Vec<String> = ["Extra", "Menu", "Grupo", "Sistema", "Tp.Sistema", "Módulo", "", "PERFIL I"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(column_span(&header, &AssignmentColumns::default()), 1..=5);
    }

    #[test]
    fn custom_column_names() {
        let columns = AssignmentColumns {
            profile: "Role".into(),
            system_type: "Type".into(),
            system: "System".into(),
            module: "Module".into(),
            menu: "Menu".into(),
        };
        let data = rows(&[
            &["Role", "Type", "System", "Module", "Menu"],
            &["Finance", "ERP", "SAP", "GL", "Post"],
        ]);
        let table = extract_assignments("base", &data, &columns).unwrap();
        assert_eq!(table.assignments[0].profile, "Finance");
    }
}
