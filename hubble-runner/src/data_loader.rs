//! Grid loading from CSV.
//!
//! The expected header is `H0,Anc,PL`: outcome value, anchor group code and an
//! optional period-luminosity relation variant. Extra columns are ignored. A
//! missing file is reported separately from a malformed one so callers can route
//! it through the acceptability policy as missing data.

use std::path::{Path, PathBuf};

use hubble_core::{GridError, GridRow, GridTable};
use serde::Deserialize;
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("grid file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("cannot read grid file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: GridError,
    },

    #[error("grid error: {0}")]
    Grid(#[from] GridError),
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "H0")]
    value: f64,
    #[serde(rename = "Anc")]
    group: String,
    #[serde(rename = "PL", default)]
    relation: Option<String>,
}

/// Load and validate a grid table from a CSV file.
pub fn load_grid_csv(path: &Path) -> Result<GridTable, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    read_grid(file)
}

/// Parse a grid table from any CSV reader.
pub fn read_grid<R: std::io::Read>(reader: R) -> Result<GridTable, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<CsvRow>() {
        let record = record?;
        let row = GridRow::new(record.value, &record.group, record.relation.as_deref());
        // Header is line 1.
        let row = row.map_err(|source| LoadError::Row {
            line: rows.len() as u64 + 2,
            source,
        })?;
        rows.push(row);
    }
    Ok(GridTable::new(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_minimal_grid() {
        let csv = "H0,Anc,PL\n75.1,M,PL1\n72.4,L,PL2\n72.0,N,\n73.2,All,PL1\n";
        let table = read_grid(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[2].relation, None);
        assert_eq!(table.rows()[3].group.label(), "All");
    }

    #[test]
    fn relation_column_is_optional() {
        let csv = "H0,Anc\n75.1,M\n72.4,L\n";
        let table = read_grid(csv.as_bytes()).unwrap();
        assert!(table.rows().iter().all(|r| r.relation.is_none()));
    }

    #[test]
    fn unknown_code_reports_line() {
        let csv = "H0,Anc,PL\n75.1,M,PL1\n72.4,Q,PL2\n";
        match read_grid(csv.as_bytes()) {
            Err(LoadError::Row { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn header_only_is_empty_grid() {
        assert!(matches!(
            read_grid("H0,Anc,PL\n".as_bytes()),
            Err(LoadError::Grid(GridError::Empty))
        ));
    }

    #[test]
    fn non_numeric_value_is_csv_error() {
        assert!(matches!(
            read_grid("H0,Anc\nabc,M\n".as_bytes()),
            Err(LoadError::Csv(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_grid_csv(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }
}
