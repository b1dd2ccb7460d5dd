//! The end-to-end training run: load, encode, split, fit with autologging,
//! then evaluate the logged model on the held-out rows.

use serde::Serialize;
use tracing::info;

use crate::cli::HyperParams;
use crate::config::RunConfig;
use crate::dataset::{self, EVAL_TARGET_COLUMN, SplitOptions};
use crate::error::TrainerError;
use crate::ml::gbdt::{TrainDataset, TrainOptions};
use crate::ml::metrics::RegressionMetrics;
use crate::tracking::autolog::{self, MODEL_ARTIFACT_PATH};
use crate::tracking::{ModelUri, TrackingStore, TrackingUri, evaluate};

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub experiment_id: i64,
    pub model_uri: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub metrics: RegressionMetrics,
}

/// Execute one training run.
///
/// The dataset is fully loaded and split before the tracking store is
/// touched, so bad input never leaves a run behind. Once the run is open it
/// ends `FINISHED` on success and `FAILED` on any error.
pub fn run(config: &RunConfig, params: &HyperParams) -> Result<RunSummary, TrainerError> {
    info!(path = %config.dataset_path.display(), "Loading dataset");
    let table = dataset::load_csv(&config.dataset_path)?;
    let data = dataset::prepare(&table)?;
    let split = dataset::train_test_split(
        &data,
        &SplitOptions {
            train_fraction: config.train_fraction,
            seed: config.split_seed,
        },
    )?;
    info!(
        rows = data.len(),
        train = split.y_train.len(),
        test = split.y_test.len(),
        seed = config.split_seed,
        "Split dataset"
    );

    let uri = TrackingUri::parse(&config.tracking_uri)?;
    let store = TrackingStore::open(&uri, config.artifact_root.as_deref())?;
    let experiment = store.get_or_create_experiment(&config.experiment_name)?;
    let options = TrainOptions {
        n_estimators: params.n_estimators,
        max_depth: params.max_depth,
        ..TrainOptions::default()
    };

    store.with_run(
        &experiment,
        config.run_name.as_deref(),
        |run| -> Result<RunSummary, TrainerError> {
            autolog::fit(
                run,
                &TrainDataset {
                    feature_names: &data.feature_names,
                    x: &split.x_train,
                    y: &split.y_train,
                },
                &options,
            )?;

            let eval_frame = data
                .frame(split.x_test.clone())?
                .with_column(EVAL_TARGET_COLUMN, &split.y_test)?;
            let model_uri = ModelUri::new(run.run_id(), MODEL_ARTIFACT_PATH).to_string();
            let evaluation = evaluate(run, &model_uri, &eval_frame, EVAL_TARGET_COLUMN)?;

            Ok(RunSummary {
                run_id: run.run_id().to_string(),
                experiment_id: experiment.experiment_id,
                model_uri,
                train_rows: split.y_train.len(),
                test_rows: split.y_test.len(),
                metrics: evaluation.metrics,
            })
        },
    )
}
