//! Startup financials dataset: CSV loading, region encoding, feature
//! selection and the seeded train/test partition.

use std::path::PathBuf;

use thiserror::Error;

mod frame;
mod loader;
mod region;
mod split;

pub use frame::Frame;
pub use loader::{RawTable, load_csv};
pub use region::{Region, UnknownRegion};
pub use split::{SplitOptions, TrainTestSplit, train_row_count, train_test_split};

/// Spend column: research and development.
pub const RD_SPEND_COLUMN: &str = "R&D Spend";
/// Spend column: administration.
pub const ADMINISTRATION_COLUMN: &str = "Administration";
/// Spend column: marketing.
pub const MARKETING_SPEND_COLUMN: &str = "Marketing Spend";
/// Categorical region column.
pub const REGION_COLUMN: &str = "State";
/// Regression target.
pub const TARGET_COLUMN: &str = "Profit";
/// Name of the true-target column appended to the evaluation frame. Kept
/// distinct from [`TARGET_COLUMN`] so it never collides with model output.
pub const EVAL_TARGET_COLUMN: &str = "Profits";

/// Predictor columns in model feature order.
pub const FEATURE_COLUMNS: [&str; 4] = [
    RD_SPEND_COLUMN,
    ADMINISTRATION_COLUMN,
    MARKETING_SPEND_COLUMN,
    REGION_COLUMN,
];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },
    #[error("Failed to parse dataset {path}: {source}")]
    Parse { path: PathBuf, source: csv::Error },
    #[error("Dataset has no data rows")]
    Empty,
    #[error("Missing required column {column:?} (available: {available:?})")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("Duplicate column {0:?}")]
    DuplicateColumn(String),
    #[error("Row {row}: column {column:?} is not a finite number: {value:?}")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Row {row}: {source}")]
    UnknownRegion { row: usize, source: UnknownRegion },
    #[error("Row {row} has {actual} values but {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Column {column:?} has {actual} values but the frame has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("Train fraction must be within (0, 1), got {0}")]
    SplitFraction(f64),
    #[error("{rows} rows cannot be split with train fraction {train_fraction}")]
    TooFewRows { rows: usize, train_fraction: f64 },
}

impl DatasetError {
    /// True when the dataset file itself could not be read or parsed.
    pub fn is_file_error(&self) -> bool {
        matches!(self, DatasetError::Open { .. } | DatasetError::Parse { .. })
    }
}

/// Encoded predictors and target, row aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Predictor names in column order of `x`.
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Wrap predictor rows in a frame named after the features.
    pub fn frame(&self, rows: Vec<Vec<f64>>) -> Result<Frame, DatasetError> {
        Frame::new(self.feature_names.clone(), rows)
    }
}

/// Encode the region column and select the named predictors and target.
///
/// Every required column must be present; the target is located by name
/// rather than position.
pub fn prepare(table: &RawTable) -> Result<Dataset, DatasetError> {
    let require = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: name.to_string(),
                available: table.headers.clone(),
            })
    };
    let feature_idx = FEATURE_COLUMNS
        .iter()
        .map(|name| require(*name))
        .collect::<Result<Vec<_>, _>>()?;
    let target_idx = require(TARGET_COLUMN)?;
    if table.is_empty() {
        return Err(DatasetError::Empty);
    }

    let mut x = Vec::with_capacity(table.len());
    let mut y = Vec::with_capacity(table.len());
    for (row_idx, row) in table.rows.iter().enumerate() {
        let features = FEATURE_COLUMNS
            .iter()
            .zip(&feature_idx)
            .map(|(&name, &col)| encode_cell(row_idx, name, &row[col]))
            .collect::<Result<Vec<_>, _>>()?;
        x.push(features);
        y.push(parse_number(row_idx, TARGET_COLUMN, &row[target_idx])?);
    }

    Ok(Dataset {
        feature_names: FEATURE_COLUMNS.iter().map(|name| name.to_string()).collect(),
        x,
        y,
    })
}

fn encode_cell(row: usize, column: &str, value: &str) -> Result<f64, DatasetError> {
    if column == REGION_COLUMN {
        value
            .parse::<Region>()
            .map(Region::as_feature)
            .map_err(|source| DatasetError::UnknownRegion { row, source })
    } else {
        parse_number(row, column, value)
    }
}

fn parse_number(row: usize, column: &str, value: &str) -> Result<f64, DatasetError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| DatasetError::InvalidNumber {
            row,
            column: column.to_string(),
            value: value.to_string(),
        })
}
