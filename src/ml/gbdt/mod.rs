//! Deterministic gradient-boosted regression trees.
//!
//! A small histogram booster in the XGBoost manner:
//! - Squared-error objective with second-order split gain and L2 leaf
//!   regularisation.
//! - Depth-wise growth bounded by `max_depth`.
//! - Reproducible JSON model export/load.

use std::path::PathBuf;

use thiserror::Error;

mod cuts;
mod model;
mod train;

pub use model::{GbdtRegressor, ImportanceKind, MODEL_VERSION, Node, OBJECTIVE, RegressionTree};
pub use train::{TrainDataset, TrainOptions, TrainReport, train_gbdt_regressor};

#[derive(Debug, Error)]
pub enum GbdtError {
    #[error("Training set is empty")]
    EmptyDataset,
    #[error("Got {rows} feature rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },
    #[error("Row {row} has {actual} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Target at row {row} is not finite")]
    NonFiniteTarget { row: usize },
    #[error("Invalid hyperparameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Failed to read model {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Model JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
