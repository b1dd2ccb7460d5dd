//! CSV loader producing a row-oriented string table.

use std::path::Path;

use super::DatasetError;

/// Header plus every data row, in file order, as raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Column names in file order.
    pub headers: Vec<String>,
    /// Data rows; each row has exactly `headers.len()` fields.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a headed CSV file into a [`RawTable`].
///
/// Rows with a field count different from the header are parse errors.
pub fn load_csv(path: &Path) -> Result<RawTable, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|header| header.strip_prefix('\u{feff}').unwrap_or(header).to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    tracing::debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = rows.len(),
        "Loaded CSV"
    );
    Ok(RawTable { headers, rows })
}
