// Tabular sources (CSV/TSV, Excel, ODS) read as rows of trimmed text cells

use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::LoadError;

/// One sheet (or one CSV file) as rows of text cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self { name: name.into(), rows }
    }

    /// Cell text, empty when `row` or `col` lies outside the table.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows.get(row).map_or("", |r| cell(r, col))
    }
}

pub(crate) fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

pub(crate) fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.is_empty())
}

/// Read every sheet of `path`. CSV/TSV files yield a single table named
/// after the file.
pub fn read_tables(path: &Path) -> Result<Vec<Table>, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(path),
        "tsv" => {
            let content = read_file_as_utf8(path)?;
            Ok(vec![parse_delimited(&table_name(path), &content, b'\t', path)?])
        }
        _ => {
            let content = read_file_as_utf8(path)?;
            let delimiter = sniff_delimiter(&content);
            Ok(vec![parse_delimited(&table_name(path), &content, delimiter, path)?])
        }
    }
}

/// Parse CSV text held in memory.
pub fn read_csv_str(name: &str, content: &str) -> Result<Table, LoadError> {
    parse_delimited(name, content, sniff_delimiter(content), Path::new(name))
}

fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_delimited(name: &str, content: &str, delimiter: u8, path: &Path) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| LoadError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }

    Ok(Table::new(name, rows))
}

/// Pick the delimiter that splits the first non-blank lines into the same
/// number of fields most often, weighted by that width. Ties go to the comma.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    [b'|', b'\t', b';', b',']
        .into_iter()
        .filter_map(|delimiter| {
            let widths: Vec<usize> = sample.iter().map(|l| field_count(l, delimiter)).collect();
            let first = *widths.first().filter(|&&w| w > 1)?;
            let agreeing = widths.iter().filter(|&&w| w == first).count();
            Some((agreeing * first, delimiter))
        })
        .max_by_key(|&(score, _)| score)
        .map_or(b',', |(_, delimiter)| delimiter)
}

fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |r| r.len())
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let io_err = |e: std::io::Error| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => {
            if let Some(rest) = s.strip_prefix('\u{feff}') {
                return Ok(rest.to_string());
            }
            Ok(s)
        }
        Err(e) => {
            // Excel-exported CSVs are often Windows-1252
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Import every worksheet of an Excel/ODS workbook (xlsx, xls, xlsb, ods).
fn read_workbook(path: &Path) -> Result<Vec<Table>, LoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        message: format!("failed to open workbook: {e}"),
    })?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(LoadError::NoSheets { path: path.display().to_string() });
    }

    let mut tables = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = workbook.worksheet_range(sheet_name).map_err(|e| LoadError::Parse {
            path: path.display().to_string(),
            message: format!("failed to read sheet '{sheet_name}': {e}"),
        })?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        log::debug!("{}: sheet '{}' has {} row(s)", path.display(), sheet_name, rows.len());
        tables.push(Table::new(sheet_name.clone(), rows));
    }

    Ok(tables)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(n) => {
            // Integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolon_delimiter() {
        let table = read_csv_str("t", "Grupo;Menu\nFinance;Post\nAudit;Review\n").unwrap();
        assert_eq!(table.rows[0], vec!["Grupo", "Menu"]);
        assert_eq!(table.rows[2], vec!["Audit", "Review"]);
    }

    #[test]
    fn sniffing_skips_leading_blank_lines_and_prefers_comma_on_ties() {
        let table = read_csv_str("t", "\nGrupo|Menu\nFinance|Post\n").unwrap();
        assert_eq!(table.rows.last().unwrap(), &vec!["Finance", "Post"]);
        assert_eq!(sniff_delimiter("a,b;c\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn cells_are_trimmed_and_short_rows_read_blank() {
        let table = read_csv_str("t", "a,b,c\n x ,y\n").unwrap();
        assert_eq!(table.cell(1, 0), "x");
        assert_eq!(table.cell(1, 2), "");
        assert_eq!(table.cell(9, 0), "");
    }

    #[test]
    fn windows_1252_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.csv");
        // "Módulo" with ó as 0xF3
        std::fs::write(&path, b"Grupo,M\xf3dulo\nFinance,GL\n").unwrap();
        let tables = read_tables(&path).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0][1], "Módulo");
        assert_eq!(tables[0].name, "legacy.csv");
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        std::fs::write(&path, "\u{feff}Grupo,Menu\nFinance,Post\n").unwrap();
        let tables = read_tables(&path).unwrap();
        assert_eq!(tables[0].rows[0][0], "Grupo");
    }

    #[test]
    fn tsv_extension_forces_tab() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        std::fs::write(&path, "Grupo\tMenu\nFinance, Inc\tPost\n").unwrap();
        let tables = read_tables(&path).unwrap();
        assert_eq!(tables[0].rows[1], vec!["Finance, Inc", "Post"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_tables(Path::new("/nonexistent/access.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(!err.is_schema_missing());
    }

    #[test]
    fn float_cells_render_without_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(42.0)), "42");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Bool(true)), "TRUE");
        assert_eq!(cell_text(&Data::String("  GL ".into())), "GL");
    }
}
