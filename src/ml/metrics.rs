//! Evaluation metrics for regression models.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("No examples to score")]
    Empty,
    #[error("Got {targets} targets but {predictions} predictions")]
    LengthMismatch { targets: usize, predictions: usize },
}

/// Standard regression metrics over one evaluation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub example_count: usize,
    pub mean_absolute_error: f64,
    pub mean_squared_error: f64,
    pub root_mean_squared_error: f64,
    pub sum_on_target: f64,
    pub mean_on_target: f64,
    /// `1 - SSE/SST`; with a constant target, 1 for a perfect fit and 0 otherwise.
    pub r2_score: f64,
    pub max_error: f64,
    /// Mean of `|y - p| / |y|` over rows with a non-zero target.
    pub mean_absolute_percentage_error: f64,
}

impl RegressionMetrics {
    /// Score `predictions` against `targets`, pairing them by index.
    pub fn compute(targets: &[f64], predictions: &[f64]) -> Result<Self, MetricsError> {
        if targets.len() != predictions.len() {
            return Err(MetricsError::LengthMismatch {
                targets: targets.len(),
                predictions: predictions.len(),
            });
        }
        if targets.is_empty() {
            return Err(MetricsError::Empty);
        }

        let n = targets.len() as f64;
        let mut abs_sum = 0.0f64;
        let mut sq_sum = 0.0f64;
        let mut max_error = 0.0f64;
        let mut pct_sum = 0.0f64;
        let mut pct_count = 0usize;
        for (&y, &p) in targets.iter().zip(predictions) {
            let abs = (y - p).abs();
            abs_sum += abs;
            sq_sum += abs * abs;
            max_error = max_error.max(abs);
            if y != 0.0 {
                pct_sum += abs / y.abs();
                pct_count += 1;
            }
        }

        let sum_on_target: f64 = targets.iter().sum();
        let mean_on_target = sum_on_target / n;
        let sst: f64 = targets
            .iter()
            .map(|&y| (y - mean_on_target) * (y - mean_on_target))
            .sum();
        let r2_score = if sst > 0.0 {
            1.0 - sq_sum / sst
        } else if sq_sum == 0.0 {
            1.0
        } else {
            0.0
        };
        let mse = sq_sum / n;

        Ok(Self {
            example_count: targets.len(),
            mean_absolute_error: abs_sum / n,
            mean_squared_error: mse,
            root_mean_squared_error: mse.sqrt(),
            sum_on_target,
            mean_on_target,
            r2_score,
            max_error,
            mean_absolute_percentage_error: if pct_count == 0 {
                0.0
            } else {
                pct_sum / pct_count as f64
            },
        })
    }

    /// Metric name/value pairs in a stable order, for logging.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("example_count", self.example_count as f64),
            ("mean_absolute_error", self.mean_absolute_error),
            ("mean_squared_error", self.mean_squared_error),
            ("root_mean_squared_error", self.root_mean_squared_error),
            ("sum_on_target", self.sum_on_target),
            ("mean_on_target", self.mean_on_target),
            ("r2_score", self.r2_score),
            ("max_error", self.max_error),
            (
                "mean_absolute_percentage_error",
                self.mean_absolute_percentage_error,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn computes_known_values() {
        let targets = [3.0, -0.5, 2.0, 7.0];
        let predictions = [2.5, 0.0, 2.0, 8.0];
        let m = RegressionMetrics::compute(&targets, &predictions).unwrap();
        assert_eq!(m.example_count, 4);
        assert!(close(m.mean_absolute_error, 0.5));
        assert!(close(m.mean_squared_error, 0.375));
        assert!(close(m.root_mean_squared_error, 0.375f64.sqrt()));
        assert!(close(m.sum_on_target, 11.5));
        assert!(close(m.mean_on_target, 2.875));
        assert!((m.r2_score - 0.948_608_137_044_967_9).abs() < 1e-12);
        assert!(close(m.max_error, 1.0));
        let mape = (0.5 / 3.0 + 0.5 / 0.5 + 0.0 + 1.0 / 7.0) / 4.0;
        assert!(close(m.mean_absolute_percentage_error, mape));
    }

    #[test]
    fn constant_target_r2_edges() {
        let perfect = RegressionMetrics::compute(&[2.0, 2.0], &[2.0, 2.0]).unwrap();
        assert_eq!(perfect.r2_score, 1.0);
        let off = RegressionMetrics::compute(&[2.0, 2.0], &[1.0, 3.0]).unwrap();
        assert_eq!(off.r2_score, 0.0);
    }

    #[test]
    fn zero_targets_are_skipped_for_percentage_error() {
        let m = RegressionMetrics::compute(&[0.0, 4.0], &[1.0, 2.0]).unwrap();
        assert!(close(m.mean_absolute_percentage_error, 0.5));
        let all_zero = RegressionMetrics::compute(&[0.0], &[1.0]).unwrap();
        assert_eq!(all_zero.mean_absolute_percentage_error, 0.0);
    }

    #[test]
    fn rejects_empty_and_mismatched_inputs() {
        assert_eq!(
            RegressionMetrics::compute(&[], &[]),
            Err(MetricsError::Empty)
        );
        assert_eq!(
            RegressionMetrics::compute(&[1.0], &[1.0, 2.0]),
            Err(MetricsError::LengthMismatch {
                targets: 1,
                predictions: 2
            })
        );
    }

    #[test]
    fn entries_list_every_metric_once() {
        let m = RegressionMetrics::compute(&[1.0, 2.0], &[1.5, 2.5]).unwrap();
        let names: Vec<_> = m.entries().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names.len(), 9);
        assert!(names.contains(&"mean_absolute_error"));
        assert!(names.contains(&"r2_score"));
    }
}
