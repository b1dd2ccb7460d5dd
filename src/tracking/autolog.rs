use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use super::read::MODEL_FILE_NAME;
use super::run::ActiveRun;
use super::util::now_millis;
use super::TrackingError;
use crate::ml::gbdt::{
    GbdtRegressor, ImportanceKind, MODEL_VERSION, TrainDataset, TrainOptions, train_gbdt_regressor,
};

/// Artifact directory the fitted model is logged under.
pub const MODEL_ARTIFACT_PATH: &str = "model";
/// Per-round training metric.
pub const TRAIN_RMSE_METRIC: &str = "train-rmse";
const MANIFEST_FILE_NAME: &str = "MLmodel.json";
const FLAVOR: &str = "gbdt";

/// Describes a logged model directory so it can be loaded without the run.
#[derive(Debug, Serialize)]
struct ModelManifest<'a> {
    artifact_path: &'a str,
    run_id: &'a str,
    flavor: &'a str,
    model_file: &'a str,
    model_version: i64,
    objective: &'a str,
    feature_names: &'a [String],
    /// Epoch milliseconds.
    created_at: i64,
}

/// Fit the booster and record it on `run`.
///
/// Logs hyperparameters before fitting, then the fitted `base_score`, the
/// `train-rmse` curve, estimator tags, the model directory and both
/// feature-importance tables.
pub fn fit(
    run: &mut ActiveRun<'_>,
    dataset: &TrainDataset<'_>,
    options: &TrainOptions,
) -> Result<GbdtRegressor, TrackingError> {
    run.log_params(options.as_params())?;
    let report = train_gbdt_regressor(dataset, options)?;
    let model = report.model;

    run.log_param("base_score", &model.base_score.to_string())?;
    run.log_metric_history(TRAIN_RMSE_METRIC, &report.train_rmse, 0)?;
    run.set_tag("estimator_name", "GbdtRegressor")?;
    run.set_tag("estimator_class", "profitboost::ml::gbdt::GbdtRegressor")?;

    log_model(run, &model)?;
    for kind in [ImportanceKind::Gain, ImportanceKind::Weight] {
        let importance: BTreeMap<String, f64> = model.feature_importance(kind);
        let path = format!("feature_importance_{}.json", kind.as_str());
        run.log_artifact_bytes(Path::new(&path), &serde_json::to_vec_pretty(&importance)?)?;
    }

    tracing::info!(
        run_id = %run.run_id(),
        trees = model.trees.len(),
        train_rmse = report.train_rmse.last().copied().unwrap_or_default(),
        "Fitted booster"
    );
    Ok(model)
}

fn log_model(run: &mut ActiveRun<'_>, model: &GbdtRegressor) -> Result<(), TrackingError> {
    let dir = Path::new(MODEL_ARTIFACT_PATH);
    run.log_artifact_bytes(&dir.join(MODEL_FILE_NAME), &model.to_json_vec()?)?;
    let run_id = run.run_id().to_string();
    let manifest = ModelManifest {
        artifact_path: MODEL_ARTIFACT_PATH,
        run_id: &run_id,
        flavor: FLAVOR,
        model_file: MODEL_FILE_NAME,
        model_version: MODEL_VERSION,
        objective: &model.objective,
        feature_names: &model.feature_names,
        created_at: now_millis(),
    };
    run.log_artifact_bytes(
        &dir.join(MANIFEST_FILE_NAME),
        &serde_json::to_vec_pretty(&manifest)?,
    )?;
    Ok(())
}
