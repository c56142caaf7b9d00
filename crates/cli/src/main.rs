// AccessGrid CLI - compare access profiles and flag conflicting co-held access

mod compare;
mod exit_codes;
mod export;
mod inspect;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use accessgrid_config::{ConfigError, Settings};
use accessgrid_io::{load_dataset, Dataset, LoadError};
use accessgrid_recon::{MatrixScope, ReconError};

use exit_codes::{EXIT_IO, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "agrid")]
#[command(about = "Compare access profiles and flag segregation-of-duties conflicts")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: $ACCESSGRID_CONFIG, then the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the profiles of an assignment table with their access counts
    #[command(after_help = "\
Examples:
  agrid profiles acessos.xlsx
  agrid profiles base.csv --json")]
    Profiles {
        /// Assignment file (CSV, TSV, XLSX, XLS, XLSB, ODS)
        file: PathBuf,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Compare the access of two or more profiles
    #[command(after_help = "\
Each --select runs one comparison; all runs share one result cache.
The conflict table is read from the assignment file unless --conflicts is given.

Examples:
  agrid compare acessos.xlsx --select Finance,Audit
  agrid compare acessos.xlsx -s Finance,Audit -s Finance,Treasury --json
  agrid compare base.csv -s Finance,Audit --conflicts sod.csv --fail-on-conflict")]
    Compare {
        /// Assignment file
        file: PathBuf,

        /// Comma-separated profile names. Repeatable.
        #[arg(long, short = 's', required = true, value_name = "PROFILES")]
        select: Vec<String>,

        /// Conflict table file (default: search the assignment file)
        #[arg(long, value_name = "FILE")]
        conflicts: Option<PathBuf>,

        /// Matrix rows: every known access, or only access held by the selection
        #[arg(long)]
        scope: Option<ScopeArg>,

        /// Output JSON to stdout instead of a text report
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit with code 6 when any selection has conflicts
        #[arg(long)]
        fail_on_conflict: bool,
    },

    /// Export one result table of a comparison as CSV
    #[command(after_help = "\
Examples:
  agrid export acessos.xlsx --select Finance,Audit --table matrix -o matrix.csv
  agrid export base.csv -s Finance,Audit -t conflicts")]
    Export {
        /// Assignment file
        file: PathBuf,

        /// Comma-separated profile names
        #[arg(long, short = 's', value_name = "PROFILES")]
        select: String,

        /// Result table to export
        #[arg(long, short = 't')]
        table: export::ExportTable,

        /// Conflict table file (default: search the assignment file)
        #[arg(long, value_name = "FILE")]
        conflicts: Option<PathBuf>,

        /// Matrix rows: every known access, or only access held by the selection
        #[arg(long)]
        scope: Option<ScopeArg>,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Load the input tables and report what was read
    #[command(after_help = "\
Examples:
  agrid validate acessos.xlsx
  agrid validate base.csv --conflicts sod.csv --json")]
    Validate {
        /// Assignment file
        file: PathBuf,

        /// Conflict table file (default: search the assignment file)
        #[arg(long, value_name = "FILE")]
        conflicts: Option<PathBuf>,

        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Catalogue,
    Selection,
}

impl From<ScopeArg> for MatrixScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Catalogue => MatrixScope::Catalogue,
            ScopeArg::Selection => MatrixScope::Selection,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("AGRID_COMMIT_HASH"), ")",
        "\nengine:  accessgrid-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("AGRID_TARGET"),
        "\ncontract_version(compare): 1",
    )
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("AGRID_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = Settings::load(cli.config.as_deref())
        .map_err(CliError::config)
        .and_then(|settings| run(cli.command, &settings));

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands, settings: &Settings) -> Result<(), CliError> {
    match command {
        Commands::Profiles { file, json } => inspect::cmd_profiles(&file, json, settings),
        Commands::Compare {
            file,
            select,
            conflicts,
            scope,
            json,
            output,
            fail_on_conflict,
        } => compare::cmd_compare(compare::CompareArgs {
            file,
            select,
            conflicts,
            scope: scope.map(MatrixScope::from),
            json,
            output,
            fail_on_conflict,
        }, settings),
        Commands::Export { file, select, table, conflicts, scope, output } => export::cmd_export(
            &file,
            &select,
            table,
            conflicts.as_deref(),
            scope.map(MatrixScope::from),
            output.as_deref(),
            settings,
        ),
        Commands::Validate { file, conflicts, json } => {
            inspect::cmd_validate(&file, conflicts.as_deref(), json, settings)
        }
    }
}

/// Load both tables with the configured column names and markers.
pub(crate) fn load(
    file: &Path,
    conflicts: Option<&Path>,
    settings: &Settings,
) -> Result<Dataset, CliError> {
    load_dataset(file, conflicts, &settings.load_options()).map_err(CliError::load)
}

/// Split "A, B,C" into profile names. Blank entries are dropped.
pub(crate) fn parse_selection(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Write `bytes` to `path`, or stdout when no path is given.
pub(crate) fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), CliError> {
    use std::io::Write;

    match path {
        Some(path) => std::fs::write(path, bytes)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display()))),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(bytes)
                .and_then(|()| handle.flush())
                .map_err(|e| CliError::io(e.to_string()))
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn load(err: LoadError) -> Self {
        let code = exit_codes::load_exit_code(&err);
        let hint = match &err {
            LoadError::MissingColumns { .. } => {
                Some("column names can be changed in the [columns] section of the settings file".to_string())
            }
            LoadError::MissingMarkers { .. } => {
                Some("the conflict table needs a header row with both profile markers; see [conflicts] in the settings file".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn recon(err: ReconError, file: &Path) -> Self {
        let code = exit_codes::recon_exit_code(&err);
        let e = Self::new(code, err.to_string());
        match err {
            ReconError::UnknownProfile(_) => {
                e.with_hint(format!("run `agrid profiles {}` to list profile names", file.display()))
            }
            _ => e,
        }
    }

    pub fn config(err: ConfigError) -> Self {
        Self::new(exit_codes::config_exit_code(&err), err.to_string())
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
