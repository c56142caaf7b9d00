//! `agrid export`: write one result table of a comparison as CSV.

use std::path::Path;

use clap::ValueEnum;

use accessgrid_config::Settings;
use accessgrid_io::AssignmentColumns;
use accessgrid_recon::{AccessIndex, AnalysisResult, MatrixScope, ReconCache};

use crate::{load, parse_selection, write_output, CliError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportTable {
    /// Every row of the selected profiles, sorted by profile then access
    Overview,
    /// Per-profile access and exclusive counts
    Profiles,
    /// Access held by every selected profile
    Common,
    /// Access held by exactly one selected profile
    Exclusive,
    /// Presence matrix with conflict flags
    Matrix,
    /// One row per flagged access and conflicting pair
    Conflicts,
}

pub fn cmd_export(
    file: &Path,
    select: &str,
    table: ExportTable,
    conflicts: Option<&Path>,
    scope: Option<MatrixScope>,
    output: Option<&Path>,
    settings: &Settings,
) -> Result<(), CliError> {
    let dataset = load(file, conflicts, settings)?;
    let mut options = settings.recon_options();
    if let Some(scope) = scope {
        options.matrix_scope = scope;
    }

    let mut cache = ReconCache::new(settings.cache.capacity);
    let tables = cache.prepare(&dataset.assignments.assignments, &dataset.conflicts.rules);
    let selected = parse_selection(select);
    let result = cache
        .analyze(&tables, &selected, &options)
        .map_err(|e| CliError::recon(e, file))?;

    let bytes = write_table(&result, &tables.index, table, settings)?;
    write_output(output, &bytes)?;
    if let Some(path) = output {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

/// Render `table` as CSV. Access columns carry the configured header names
/// so an export can be read back as an assignment table. `index` is the one
/// `result` was computed from.
pub fn write_table(
    result: &AnalysisResult,
    index: &AccessIndex,
    table: ExportTable,
    settings: &Settings,
) -> Result<Vec<u8>, CliError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    let columns = &settings.columns;
    let err = |e: csv::Error| CliError::io(e.to_string());

    match table {
        ExportTable::Overview => {
            let mut header = vec![columns.profile.as_str()];
            header.extend(access_header(columns));
            writer.write_record(&header).map_err(err)?;
            for row in index.assignments_for(&result.selected) {
                let mut record = vec![row.profile.as_str()];
                record.extend(row.access.fields());
                writer.write_record(&record).map_err(err)?;
            }
        }
        ExportTable::Profiles => {
            writer.write_record([columns.profile.as_str(), "total", "exclusive"]).map_err(err)?;
            for p in &result.profiles {
                writer
                    .write_record([p.profile.clone(), p.total.to_string(), p.exclusive.to_string()])
                    .map_err(err)?;
            }
        }
        ExportTable::Common => {
            writer.write_record(access_header(columns)).map_err(err)?;
            for access in &result.common {
                writer.write_record(access.fields()).map_err(err)?;
            }
        }
        ExportTable::Exclusive => {
            let mut header = vec![columns.profile.as_str()];
            header.extend(access_header(columns));
            writer.write_record(&header).map_err(err)?;
            for set in &result.exclusive {
                for access in &set.access {
                    let mut record = vec![set.profile.as_str()];
                    record.extend(access.fields());
                    writer.write_record(&record).map_err(err)?;
                }
            }
        }
        ExportTable::Matrix => {
            let mut header: Vec<&str> = access_header(columns).to_vec();
            header.extend(result.selected.iter().map(String::as_str));
            header.extend(["conflict", "conflict_pairs"]);
            writer.write_record(&header).map_err(err)?;

            let marks = &settings.matrix;
            for row in &result.matrix {
                let mut record: Vec<&str> = row.access.fields().to_vec();
                record.extend(
                    row.present
                        .iter()
                        .map(|p| if *p { marks.present.as_str() } else { "" }),
                );
                record.push(if row.conflict { marks.conflict.as_str() } else { "" });
                record.push(&row.conflict_pairs);
                writer.write_record(&record).map_err(err)?;
            }
        }
        ExportTable::Conflicts => {
            let mut header = vec!["profile_1", "profile_2"];
            header.extend(access_header(columns));
            header.push("reason");
            writer.write_record(&header).map_err(err)?;
            for c in &result.conflicts {
                let mut record = vec![c.profile_1.as_str(), c.profile_2.as_str()];
                record.extend(c.access.fields());
                record.push(&c.reason);
                writer.write_record(&record).map_err(err)?;
            }
        }
    }

    writer.into_inner().map_err(|e| CliError::io(e.to_string()))
}

fn access_header(columns: &AssignmentColumns) -> [&str; 4] {
    [
        columns.system_type.as_str(),
        columns.system.as_str(),
        columns.module.as_str(),
        columns.menu.as_str(),
    ]
}
