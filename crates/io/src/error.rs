use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// File could not be opened or read.
    Io { path: String, message: String },
    /// File was read but its contents could not be parsed.
    Parse { path: String, message: String },
    /// The workbook has no sheets.
    NoSheets { path: String },
    /// Required assignment columns are absent.
    MissingColumns { table: String, columns: Vec<String> },
    /// No row carries both conflict header markers.
    MissingMarkers { path: String, marker_a: String, marker_b: String },
}

impl LoadError {
    /// True when the source was readable but did not have the expected layout.
    pub fn is_schema_missing(&self) -> bool {
        matches!(self, Self::MissingColumns { .. } | Self::MissingMarkers { .. })
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read {path}: {message}"),
            Self::Parse { path, message } => write!(f, "cannot parse {path}: {message}"),
            Self::NoSheets { path } => write!(f, "{path}: workbook contains no sheets"),
            Self::MissingColumns { table, columns } => {
                write!(f, "{table}: missing column(s): {}", columns.join(", "))
            }
            Self::MissingMarkers { path, marker_a, marker_b } => write!(
                f,
                "{path}: no conflict table found (header row with '{marker_a}' and '{marker_b}')"
            ),
        }
    }
}

impl std::error::Error for LoadError {}
