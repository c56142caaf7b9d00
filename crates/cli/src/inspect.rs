//! `agrid profiles` and `agrid validate`: look at the input before comparing.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use accessgrid_config::Settings;
use accessgrid_io::Dataset;
use accessgrid_recon::{AccessIndex, ConflictIndex};

use crate::compare::InputReport;
use crate::{load, write_output, CliError};

#[derive(Debug, Serialize)]
struct ProfileCount<'a> {
    profile: &'a str,
    access: usize,
}

pub fn cmd_profiles(file: &Path, json: bool, settings: &Settings) -> Result<(), CliError> {
    let dataset = load(file, None, settings)?;
    let index = AccessIndex::build(&dataset.assignments.assignments);
    let counts = profile_counts(&index);

    let out = if json {
        let mut s = serde_json::to_string_pretty(&counts)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        s.push('\n');
        s
    } else {
        let width = counts.iter().map(|c| c.profile.chars().count()).max().unwrap_or(0);
        let mut s = String::new();
        for c in &counts {
            let _ = writeln!(s, "{:<width$}  {}", c.profile, c.access, width = width);
        }
        s
    };
    write_output(None, out.as_bytes())
}

fn profile_counts(index: &AccessIndex) -> Vec<ProfileCount<'_>> {
    index
        .profile_names()
        .map(|profile| ProfileCount {
            profile,
            access: index.access_of(profile).map_or(0, |s| s.len()),
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ValidateReport {
    #[serde(flatten)]
    input: InputReport,
    profiles: usize,
    access_tuples: usize,
    self_pairs: usize,
}

pub fn cmd_validate(
    file: &Path,
    conflicts: Option<&Path>,
    json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let dataset = load(file, conflicts, settings)?;
    let report = validate_report(file, conflicts, &dataset);

    let out = if json {
        let mut s = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        s.push('\n');
        s
    } else {
        render_validate(&report)
    };
    write_output(None, out.as_bytes())
}

fn validate_report(file: &Path, conflicts: Option<&Path>, dataset: &Dataset) -> ValidateReport {
    let index = AccessIndex::build(&dataset.assignments.assignments);
    let rules = ConflictIndex::build(&dataset.conflicts.rules);
    ValidateReport {
        input: InputReport::new(file, conflicts, dataset),
        profiles: index.profile_count(),
        access_tuples: index.catalogue().len(),
        self_pairs: rules.diagnostics().self_pairs,
    }
}

fn render_validate(r: &ValidateReport) -> String {
    let i = &r.input;
    let mut s = String::new();
    let _ = writeln!(
        s,
        "{} [{}]: {} assignment(s), {} profile(s), {} access tuple(s)",
        i.file, i.assignment_table, i.assignments, r.profiles, r.access_tuples
    );
    if i.skipped_rows > 0 {
        let _ = writeln!(s, "  skipped {} row(s) with a blank required column", i.skipped_rows);
    }
    if i.duplicate_rows > 0 {
        let _ = writeln!(s, "  dropped {} duplicate row(s)", i.duplicate_rows);
    }
    match &i.conflict_table {
        Some(table) => {
            let _ = writeln!(s, "conflicts [{}]: {} rule(s)", table, i.conflict_rules);
            if i.malformed_rows > 0 {
                let _ = writeln!(s, "  {} row(s) missing a profile name", i.malformed_rows);
            }
            if r.self_pairs > 0 {
                let _ = writeln!(s, "  {} rule(s) pair a profile with itself", r.self_pairs);
            }
        }
        None => {
            let _ = writeln!(s, "conflicts: no conflict table found");
        }
    }
    s
}
