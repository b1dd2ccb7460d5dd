//! Top-level error taxonomy for a training run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::ml::gbdt::GbdtError;
use crate::tracking::TrackingError;

/// Why a training run did not complete.
#[derive(Debug, Error)]
pub enum TrainerError {
    /// A hyperparameter could not be converted to a positive integer.
    #[error("Invalid argument --{name} {value:?}: {reason}")]
    Argument {
        name: &'static str,
        value: String,
        reason: String,
    },
    /// The dataset file is missing or could not be parsed.
    #[error("{0}")]
    File(DatasetError),
    /// The dataset parsed but its contents are unusable.
    #[error("{0}")]
    Data(DatasetError),
    #[error("Model fit failed: {0}")]
    ModelFit(GbdtError),
    #[error("Tracking store error: {0}")]
    TrackingStore(TrackingError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<DatasetError> for TrainerError {
    fn from(err: DatasetError) -> Self {
        if err.is_file_error() {
            TrainerError::File(err)
        } else {
            TrainerError::Data(err)
        }
    }
}

impl From<GbdtError> for TrainerError {
    fn from(err: GbdtError) -> Self {
        TrainerError::ModelFit(err)
    }
}

/// Booster and frame failures surfacing through the store keep their own
/// category.
impl From<TrackingError> for TrainerError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::Model(inner) => TrainerError::ModelFit(inner),
            TrackingError::Frame(inner) => TrainerError::from(inner),
            other => TrainerError::TrackingStore(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn dataset_errors_split_into_file_and_data() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let file = TrainerError::from(DatasetError::Open {
            path: PathBuf::from("x.csv"),
            source: csv::Error::from(io),
        });
        assert!(matches!(file, TrainerError::File(_)));

        let data = TrainerError::from(DatasetError::Empty);
        assert!(matches!(data, TrainerError::Data(_)));
    }

    #[test]
    fn tracking_errors_keep_their_origin() {
        let fit = TrainerError::from(TrackingError::Model(GbdtError::EmptyDataset));
        assert!(matches!(fit, TrainerError::ModelFit(_)));

        let frame = TrainerError::from(TrackingError::Frame(DatasetError::DuplicateColumn(
            "Profits".into(),
        )));
        assert!(matches!(frame, TrainerError::Data(_)));

        let store = TrainerError::from(TrackingError::Busy);
        assert!(matches!(store, TrainerError::TrackingStore(_)));
    }
}
