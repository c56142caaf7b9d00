//! `agrid compare`: reconcile one or more profile selections.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use accessgrid_config::Settings;
use accessgrid_io::Dataset;
use accessgrid_recon::{
    compute_summary, AnalysisResult, MatrixScope, ReconCache, ReconOptions, ReconSummary,
};

use crate::exit_codes::EXIT_CONFLICTS_FOUND;
use crate::{load, parse_selection, write_output, CliError};

/// Version of the `--json` output shape.
pub const CONTRACT_VERSION: u32 = 1;

pub struct CompareArgs {
    pub file: PathBuf,
    pub select: Vec<String>,
    pub conflicts: Option<PathBuf>,
    pub scope: Option<MatrixScope>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub fail_on_conflict: bool,
}

#[derive(Debug, Serialize)]
struct CompareOutput<'a> {
    contract_version: u32,
    input: InputReport,
    runs: Vec<RunReport<'a>>,
}

/// What the loader read and dropped.
#[derive(Debug, Serialize)]
pub(crate) struct InputReport {
    pub file: String,
    pub conflict_file: Option<String>,
    pub assignment_table: String,
    pub assignments: usize,
    pub skipped_rows: usize,
    pub duplicate_rows: usize,
    pub conflict_table: Option<String>,
    pub conflict_rules: usize,
    pub malformed_rows: usize,
}

impl InputReport {
    pub(crate) fn new(file: &Path, conflict_file: Option<&Path>, ds: &Dataset) -> Self {
        let conflict_table =
            (!ds.conflicts.source.is_empty()).then(|| ds.conflicts.source.clone());
        Self {
            file: file.display().to_string(),
            conflict_file: conflict_file.map(|p| p.display().to_string()),
            assignment_table: ds.assignments.source.clone(),
            assignments: ds.assignments.assignments.len(),
            skipped_rows: ds.assignments.skipped_rows,
            duplicate_rows: ds.assignments.duplicate_rows,
            conflict_table,
            conflict_rules: ds.conflicts.rules.len(),
            malformed_rows: ds.conflicts.malformed_rows,
        }
    }
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    summary: ReconSummary,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

pub fn cmd_compare(args: CompareArgs, settings: &Settings) -> Result<(), CliError> {
    let dataset = load(&args.file, args.conflicts.as_deref(), settings)?;
    let mut options = settings.recon_options();
    if let Some(scope) = args.scope {
        options.matrix_scope = scope;
    }

    let results = analyze_all(&dataset, &args.select, &options, settings, &args.file)?;

    // Human summary to stderr
    for result in &results {
        eprintln!("{}", summary_line(result, &compute_summary(result)));
    }

    if args.json || args.output.is_some() {
        let output = CompareOutput {
            contract_version: CONTRACT_VERSION,
            input: InputReport::new(&args.file, args.conflicts.as_deref(), &dataset),
            runs: results
                .iter()
                .map(|r| RunReport { summary: compute_summary(r), result: r })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = args.output {
            write_output(Some(path.as_path()), json.as_bytes())?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json}");
        }
    } else {
        let mut text = String::new();
        for result in &results {
            render_text(&mut text, result, settings);
        }
        write_output(None, text.as_bytes())?;
    }

    if args.fail_on_conflict && results.iter().any(|r| r.has_conflicts()) {
        return Err(CliError::new(EXIT_CONFLICTS_FOUND, "conflicts found"));
    }
    Ok(())
}

/// Run every selection through one cache. Repeated selections reuse the
/// first result.
fn analyze_all(
    dataset: &Dataset,
    selections: &[String],
    options: &ReconOptions,
    settings: &Settings,
    file: &Path,
) -> Result<Vec<Arc<AnalysisResult>>, CliError> {
    let mut cache = ReconCache::new(settings.cache.capacity);
    let tables = cache.prepare(&dataset.assignments.assignments, &dataset.conflicts.rules);

    let mut results = Vec::with_capacity(selections.len());
    for raw in selections {
        let selected = parse_selection(raw);
        let result = cache
            .analyze(&tables, &selected, options)
            .map_err(|e| CliError::recon(e, file))?;
        results.push(result);
    }

    let stats = cache.stats();
    tracing::debug!(hits = stats.hits, misses = stats.misses, "recon cache");
    Ok(results)
}

pub(crate) fn summary_line(result: &AnalysisResult, s: &ReconSummary) -> String {
    format!(
        "{}: {} access held, {} common, {} exclusive, {} flagged ({} conflict rows, {} pairs)",
        result.selected.join(", "),
        s.union,
        s.common,
        s.exclusive,
        s.flagged_tuples,
        s.conflict_rows,
        s.conflicting_pairs,
    )
}

fn render_text(out: &mut String, result: &AnalysisResult, settings: &Settings) {
    let _ = writeln!(out, "== {} ==", result.selected.join(" x "));

    let width = result.profiles.iter().map(|p| p.profile.chars().count()).max().unwrap_or(0);
    for p in &result.profiles {
        let _ = writeln!(
            out,
            "  {:<width$}  {} access, {} exclusive",
            p.profile,
            p.total,
            p.exclusive,
            width = width
        );
    }

    let _ = writeln!(out, "\ncommon ({}):", result.common.len());
    for access in &result.common {
        let _ = writeln!(out, "  {access}");
    }

    for set in &result.exclusive {
        let _ = writeln!(out, "\nonly {} ({}):", set.profile, set.access.len());
        for access in &set.access {
            let _ = writeln!(out, "  {access}");
        }
    }

    let _ = writeln!(out, "\nconflicts ({}):", result.conflicts.len());
    for c in &result.conflicts {
        let _ = writeln!(
            out,
            "  {} {} x {}  {}  {}",
            settings.matrix.conflict, c.profile_1, c.profile_2, c.access, c.reason
        );
    }

    let flagged = result.matrix.iter().filter(|r| r.conflict).count();
    let _ = writeln!(
        out,
        "\nmatrix: {} row(s) ({} scope), {} flagged",
        result.matrix.len(),
        result.matrix_scope,
        flagged
    );
    let _ = writeln!(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use accessgrid_recon::{run, AccessAssignment, AccessIndex, AccessTuple, ConflictRule};

    fn sample() -> AnalysisResult {
        let post = AccessTuple::new("ERP", "SAP", "GL", "Post Entry");
        let review = AccessTuple::new("ERP", "SAP", "GL", "Review");
        let index = AccessIndex::build(&[
            AccessAssignment::new("Finance", post.clone()),
            AccessAssignment::new("Audit", post),
            AccessAssignment::new("Audit", review),
        ]);
        let rules = [ConflictRule::new("Audit", "Finance", "SoD violation")];
        run(&index, &rules, &["Finance", "Audit"], &ReconOptions::default()).unwrap()
    }

    #[test]
    fn text_report_lists_each_section() {
        let result = sample();
        let mut text = String::new();
        render_text(&mut text, &result, &Settings::default());
        assert!(text.starts_with("== Finance x Audit =="));
        assert!(text.contains("common (1):\n  ERP / SAP / GL / Post Entry"));
        assert!(text.contains("only Audit (1):\n  ERP / SAP / GL / Review"));
        assert!(text.contains("Finance x Audit  ERP / SAP / GL / Post Entry  SoD violation"));
        assert!(text.contains("matrix: 2 row(s) (catalogue scope), 1 flagged"));
    }

    #[test]
    fn summary_line_counts() {
        let result = sample();
        let line = summary_line(&result, &compute_summary(&result));
        assert_eq!(
            line,
            "Finance, Audit: 2 access held, 1 common, 1 exclusive, 1 flagged (1 conflict rows, 1 pairs)"
        );
    }

    #[test]
    fn repeated_selection_is_served_from_cache() {
        let dataset = Dataset {
            assignments: accessgrid_io::AssignmentTable {
                assignments: vec![
                    AccessAssignment::new("Finance", AccessTuple::new("a", "b", "c", "d")),
                    AccessAssignment::new("Audit", AccessTuple::new("a", "b", "c", "d")),
                ],
                ..Default::default()
            },
            conflicts: Default::default(),
        };
        let selections = vec!["Finance,Audit".to_string(), "Finance, Audit".to_string()];
        let results = analyze_all(
            &dataset,
            &selections,
            &ReconOptions::default(),
            &Settings::default(),
            Path::new("base.csv"),
        )
        .unwrap();
        assert!(Arc::ptr_eq(&results[0], &results[1]));
    }
}
