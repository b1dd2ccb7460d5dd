use std::path::Path;

use serde::Serialize;

use super::run::ActiveRun;
use super::{ArtifactEntry, TrackingError};
use crate::dataset::Frame;
use crate::ml::metrics::RegressionMetrics;

/// Per-row feature values, target and prediction.
pub const EVAL_TABLE_ARTIFACT: &str = "eval_results_table.json";
/// Column holding model output in the evaluation table.
pub const PREDICTION_COLUMN: &str = "prediction";

/// Outcome of evaluating a logged model.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub model_uri: String,
    pub metrics: RegressionMetrics,
    pub predictions: Vec<f64>,
    pub table: ArtifactEntry,
}

/// Score the model at `model_uri` on `frame`, using the column `targets` as
/// ground truth, and log the metrics plus a results table on `run`.
///
/// The model is loaded from its artifact, never refitted. Features are taken
/// from `frame` by the model's own feature names.
pub fn evaluate(
    run: &mut ActiveRun<'_>,
    model_uri: &str,
    frame: &Frame,
    targets: &str,
) -> Result<EvaluationResult, TrackingError> {
    let model = run.store().load_model(model_uri)?;
    let x = frame.select(&model.feature_names)?;
    let y = frame.column(targets)?;
    let predictions = model.predict_batch(&x)?;
    let metrics = RegressionMetrics::compute(&y, &predictions)?;

    for (key, value) in metrics.entries() {
        run.log_metric(key, value, 0)?;
    }
    let table = Frame::new(model.feature_names.clone(), x)?
        .with_column(targets, &y)?
        .with_column(PREDICTION_COLUMN, &predictions)?;
    let table = run.log_artifact_bytes(
        Path::new(EVAL_TABLE_ARTIFACT),
        &serde_json::to_vec_pretty(&table)?,
    )?;

    tracing::info!(
        run_id = %run.run_id(),
        examples = metrics.example_count,
        mae = metrics.mean_absolute_error,
        r2 = metrics.r2_score,
        "Evaluated model"
    );
    Ok(EvaluationResult {
        model_uri: model_uri.to_string(),
        metrics,
        predictions,
        table,
    })
}
