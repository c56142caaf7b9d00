// Load both input tables from files on disk

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::assignments::{
    column_span, extract_assignments, find_header_row, AssignmentColumns, AssignmentTable,
};
use crate::conflicts::{
    extract_conflicts, find_marker_row, marker_columns, ConflictMarkers, ConflictTable,
};
use crate::error::LoadError;
use crate::table::{read_tables, Table};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    #[serde(default)]
    pub columns: AssignmentColumns,
    #[serde(default)]
    pub markers: ConflictMarkers,
}

/// Assignment rows and conflict rules ready for the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub assignments: AssignmentTable,
    pub conflicts: ConflictTable,
}

/// Load assignments from `access_path` and conflict rules from
/// `conflict_path`, or from the access file when none is given.
///
/// The conflict table is optional inside the access file but required in
/// an explicitly named conflict file.
pub fn load_dataset(
    access_path: &Path,
    conflict_path: Option<&Path>,
    options: &LoadOptions,
) -> Result<Dataset, LoadError> {
    let access_tables = read_tables(access_path)?;
    match conflict_path {
        Some(path) => {
            let conflict_tables = read_tables(path)?;
            let conflicts = conflicts_from_tables(&conflict_tables, &options.markers)
                .ok_or_else(|| LoadError::MissingMarkers {
                    path: path.display().to_string(),
                    marker_a: options.markers.profile_a.clone(),
                    marker_b: options.markers.profile_b.clone(),
                })?;
            let assignments = assignments_from_tables(&access_tables, options)?;
            Ok(Dataset { assignments, conflicts })
        }
        None => Dataset::from_tables(&access_tables, options),
    }
}

impl Dataset {
    /// Both tables from one set of sheets. No conflict marker means no rules.
    pub fn from_tables(tables: &[Table], options: &LoadOptions) -> Result<Self, LoadError> {
        let assignments = assignments_from_tables(tables, options)?;
        let conflicts = conflicts_from_tables(tables, &options.markers).unwrap_or_else(|| {
            log::debug!("no conflict table found; running without conflict rules");
            ConflictTable::default()
        });
        Ok(Self { assignments, conflicts })
    }
}

/// First table with the assignment header. When the conflict table shares
/// that sheet below the assignments, data rows stop at its marker row. A
/// conflict table beside them, outside the assignment columns, does not
/// cut them short.
fn assignments_from_tables(
    tables: &[Table],
    options: &LoadOptions,
) -> Result<AssignmentTable, LoadError> {
    let found = tables
        .iter()
        .find_map(|t| find_header_row(&t.rows, &options.columns).map(|h| (t, h)));

    let Some((table, header_idx)) = found else {
        // Report missing columns against the first sheet
        return match tables.first() {
            Some(t) => extract_assignments(&t.name, &t.rows, &options.columns),
            None => extract_assignments("", &[], &options.columns),
        };
    };

    let span = column_span(&table.rows[header_idx], &options.columns);
    let end = table
        .rows
        .iter()
        .enumerate()
        .skip(header_idx + 1)
        .find(|(_, row)| {
            marker_columns(row, &options.markers)
                .map_or(false, |(a, b)| span.contains(&a) || span.contains(&b))
        })
        .map_or(table.rows.len(), |(i, _)| i);
    extract_assignments(&table.name, &table.rows[..end], &options.columns)
}

fn conflicts_from_tables(tables: &[Table], markers: &ConflictMarkers) -> Option<ConflictTable> {
    tables.iter().find_map(|t| {
        find_marker_row(&t.rows, markers).map(|h| extract_conflicts(&t.name, &t.rows, h, markers))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, lines: &[&[&str]]) -> Table {
        Table::new(
            name,
            lines
                .iter()
                .map(|l| l.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    const HEADER: &[&str] = &["Grupo", "Tp.Sistema", "Sistema", "Módulo", "Menu"];

    #[test]
    fn conflict_table_below_assignments_in_same_sheet() {
        let sheet = table(
            "Base",
            &[
                HEADER,
                &["Finance", "ERP", "SAP", "GL", "Post Entry"],
                &["Audit", "ERP", "SAP", "GL", "Post Entry"],
                &[],
                &["PERFIL I", "PERFIL II", "MOTIVO"],
                &["Finance", "Audit", "SoD violation"],
            ],
        );
        let ds = Dataset::from_tables(&[sheet], &LoadOptions::default()).unwrap();
        assert_eq!(ds.assignments.assignments.len(), 2);
        // The marker row and rules are not read as assignments.
        assert_eq!(ds.assignments.skipped_rows, 0);
        assert_eq!(ds.conflicts.rules.len(), 1);
        assert_eq!(ds.conflicts.source, "Base");
    }

    #[test]
    fn conflict_table_beside_assignments_on_header_row() {
        let sheet = table(
            "Base",
            &[
                &["Grupo", "Tp.Sistema", "Sistema", "Módulo", "Menu", "", "PERFIL I", "PERFIL II", "MOTIVO"],
                &["Finance", "ERP", "SAP", "GL", "Post Entry", "", "Finance", "Audit", "SoD violation"],
                &["Audit", "ERP", "SAP", "GL", "Post Entry", "", "Ops", "", "half"],
                &["Ops", "ERP", "SAP", "GL", "Run Batch"],
            ],
        );
        let ds = Dataset::from_tables(&[sheet], &LoadOptions::default()).unwrap();
        assert_eq!(ds.assignments.assignments.len(), 3);
        assert_eq!(ds.assignments.skipped_rows, 0);
        assert_eq!(ds.conflicts.rules.len(), 2);
        assert_eq!(ds.conflicts.malformed_rows, 1);
    }

    #[test]
    fn conflict_table_beside_assignments_below_header() {
        let sheet = table(
            "Base",
            &[
                HEADER,
                &["Finance", "ERP", "SAP", "GL", "Post Entry", "", "PERFIL I", "PERFIL II", "MOTIVO"],
                &["Audit", "ERP", "SAP", "GL", "Post Entry", "", "Finance", "Audit", "SoD violation"],
                &["Ops", "ERP", "SAP", "GL", "Run Batch", "", "Ops", "Finance", "Run and post"],
                &["Treasury", "ERP", "SAP", "AP", "Pay"],
                &["", "", "", "", "", "", "Treasury", "Ops", "Pay and run"],
            ],
        );
        let ds = Dataset::from_tables(&[sheet], &LoadOptions::default()).unwrap();
        assert_eq!(ds.assignments.assignments.len(), 4);
        assert_eq!(ds.assignments.skipped_rows, 0);
        // Rule rows stop at the first row with blank conflict cells
        assert_eq!(ds.conflicts.rules.len(), 2);
        assert_eq!(ds.conflicts.malformed_rows, 0);
    }

    #[test]
    fn conflict_table_in_another_sheet() {
        let base = table("Base", &[HEADER, &["Finance", "ERP", "SAP", "GL", "Post Entry"]]);
        let rules = table(
            "Conflitos",
            &[&["Matriz SoD"], &["PERFIL I", "PERFIL II", "MOTIVO"], &["Finance", "Audit", "x"]],
        );
        let ds = Dataset::from_tables(&[base, rules], &LoadOptions::default()).unwrap();
        assert_eq!(ds.conflicts.rules.len(), 1);
        assert_eq!(ds.conflicts.source, "Conflitos");
    }

    #[test]
    fn no_conflict_table_is_not_an_error() {
        let base = table("Base", &[HEADER, &["Finance", "ERP", "SAP", "GL", "Post Entry"]]);
        let ds = Dataset::from_tables(&[base], &LoadOptions::default()).unwrap();
        assert!(ds.conflicts.rules.is_empty());
    }

    #[test]
    fn missing_assignment_header_is_schema_error() {
        let base = table("Base", &[&["Grupo", "Menu"], &["Finance", "Post"]]);
        let err = Dataset::from_tables(&[base], &LoadOptions::default()).unwrap_err();
        assert!(err.is_schema_missing());
        assert!(err.to_string().contains("Base: missing column(s): Tp.Sistema, Sistema, Módulo"));
    }

    #[test]
    fn explicit_conflict_file_without_markers_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let access = dir.path().join("base.csv");
        let conflicts = dir.path().join("conflitos.csv");
        std::fs::write(&access, "Grupo,Tp.Sistema,Sistema,Módulo,Menu\nFinance,ERP,SAP,GL,Post\n")
            .unwrap();
        std::fs::write(&conflicts, "A,B,Reason\nFinance,Audit,x\n").unwrap();

        let err = load_dataset(&access, Some(conflicts.as_path()), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingMarkers { .. }));
        assert!(err.is_schema_missing());
    }

    #[test]
    fn loads_separate_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let access = dir.path().join("base.csv");
        let conflicts = dir.path().join("conflitos.csv");
        std::fs::write(
            &access,
            "Grupo;Tp.Sistema;Sistema;Módulo;Menu\nFinance;ERP;SAP;GL;Post\nAudit;ERP;SAP;GL;Post\n",
        )
        .unwrap();
        std::fs::write(&conflicts, "PERFIL I,PERFIL II,MOTIVO\nFinance,Audit,SoD\n").unwrap();

        let ds = load_dataset(&access, Some(conflicts.as_path()), &LoadOptions::default()).unwrap();
        assert_eq!(ds.assignments.assignments.len(), 2);
        assert_eq!(ds.conflicts.rules[0].reason, "SoD");
    }
}
