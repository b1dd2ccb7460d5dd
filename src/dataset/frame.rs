use serde::{Deserialize, Serialize};

use super::DatasetError;

/// Named numeric columns over row-major data.
///
/// Serializes as `{"columns": [...], "data": [[...], ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    #[serde(rename = "data")]
    rows: Vec<Vec<f64>>,
}

impl Frame {
    /// Build a frame, checking every row against the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, DatasetError> {
        for (idx, name) in columns.iter().enumerate() {
            if columns[..idx].contains(name) {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }
        if let Some(row) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(DatasetError::RowWidth {
                row,
                expected: columns.len(),
                actual: rows[row].len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Copy out one column by name.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Append a column; the name must be new and the length must match.
    pub fn with_column(mut self, name: &str, values: &[f64]) -> Result<Self, DatasetError> {
        if self.column_index(name).is_some() {
            return Err(DatasetError::DuplicateColumn(name.to_string()));
        }
        if values.len() != self.rows.len() {
            return Err(DatasetError::ColumnLength {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        self.columns.push(name.to_string());
        for (row, &value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(self)
    }

    /// Project rows onto `names`, in that order.
    pub fn select(&self, names: &[String]) -> Result<Vec<Vec<f64>>, DatasetError> {
        let indices = names
            .iter()
            .map(|name| self.require(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&idx| row[idx]).collect())
            .collect())
    }

    fn require(&self, name: &str) -> Result<usize, DatasetError> {
        self.column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }
}
