use super::GbdtError;
use super::cuts::FeatureCuts;
use super::model::{GbdtRegressor, MODEL_VERSION, Node, OBJECTIVE, RegressionTree};

/// Splits must reduce the loss by more than this to be kept.
const MIN_SPLIT_GAIN: f64 = 1e-6;
/// Upper bound on boosting rounds per fit.
pub const MAX_ESTIMATORS: usize = 100_000;

/// Boosting hyperparameters. Defaults follow XGBoost.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    /// Number of boosting rounds (one tree per round).
    pub n_estimators: usize,
    /// Maximum split levels per tree.
    pub max_depth: usize,
    /// Shrinkage applied to every leaf weight.
    pub learning_rate: f64,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// Minimum loss reduction for a split.
    pub gamma: f64,
    /// Minimum hessian sum in each child.
    pub min_child_weight: f64,
    /// Maximum histogram bins per feature, in `2..=256`.
    pub max_bin: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            max_bin: 256,
        }
    }
}

impl TrainOptions {
    /// Hyperparameters as loggable key/value pairs.
    pub fn as_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("n_estimators", self.n_estimators.to_string()),
            ("max_depth", self.max_depth.to_string()),
            ("learning_rate", self.learning_rate.to_string()),
            ("reg_lambda", self.reg_lambda.to_string()),
            ("gamma", self.gamma.to_string()),
            ("min_child_weight", self.min_child_weight.to_string()),
            ("max_bin", self.max_bin.to_string()),
            ("objective", OBJECTIVE.to_string()),
        ]
    }

    fn validate(&self) -> Result<(), GbdtError> {
        let invalid = |name, reason: &str| {
            Err(GbdtError::InvalidParam {
                name,
                reason: reason.to_string(),
            })
        };
        if self.n_estimators == 0 {
            return invalid("n_estimators", "must be positive");
        }
        if self.n_estimators > MAX_ESTIMATORS {
            return invalid("n_estimators", "must be at most 100000");
        }
        if self.max_depth == 0 {
            return invalid("max_depth", "must be positive");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid("learning_rate", "must be a positive finite number");
        }
        if !(self.reg_lambda >= 0.0 && self.reg_lambda.is_finite()) {
            return invalid("reg_lambda", "must be a non-negative finite number");
        }
        if !(self.gamma >= 0.0 && self.gamma.is_finite()) {
            return invalid("gamma", "must be a non-negative finite number");
        }
        if !(self.min_child_weight >= 0.0 && self.min_child_weight.is_finite()) {
            return invalid("min_child_weight", "must be a non-negative finite number");
        }
        if !(2..=256).contains(&self.max_bin) {
            return invalid("max_bin", "must be within 2..=256");
        }
        Ok(())
    }
}

/// Borrowed training inputs; `x[i]` pairs with `y[i]`.
#[derive(Debug, Clone, Copy)]
pub struct TrainDataset<'a> {
    pub feature_names: &'a [String],
    pub x: &'a [Vec<f64>],
    pub y: &'a [f64],
}

/// Fitted model plus the per-round training curve.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub model: GbdtRegressor,
    /// Training RMSE after each boosting round.
    pub train_rmse: Vec<f64>,
}

/// Fit boosted regression trees on squared error.
///
/// Gradients are `prediction - target` with unit hessians. Deterministic:
/// ties between candidate splits resolve to the lowest feature, then the
/// lowest bin.
pub fn train_gbdt_regressor(
    dataset: &TrainDataset<'_>,
    options: &TrainOptions,
) -> Result<TrainReport, GbdtError> {
    options.validate()?;
    validate_dataset(dataset)?;

    let n = dataset.y.len();
    let d = dataset.feature_names.len();
    let cuts: Vec<FeatureCuts> = (0..d)
        .map(|j| FeatureCuts::build(dataset.x.iter().map(|row| row[j]), options.max_bin))
        .collect();
    let binned: Vec<Vec<u8>> = dataset
        .x
        .iter()
        .map(|row| row.iter().zip(&cuts).map(|(&v, c)| c.bin(v)).collect())
        .collect();

    let base_score = dataset.y.iter().sum::<f64>() / n as f64;
    let mut predictions = vec![base_score; n];
    let mut grads = vec![0.0f64; n];
    let hess = vec![1.0f64; n];
    let grower = TreeGrower {
        binned: &binned,
        cuts: &cuts,
        options,
    };

    let mut trees = Vec::new();
    let mut train_rmse = Vec::new();
    for round in 0..options.n_estimators {
        for i in 0..n {
            grads[i] = predictions[i] - dataset.y[i];
        }
        let tree = grower.grow(&grads, &hess);
        for (prediction, row) in predictions.iter_mut().zip(dataset.x) {
            *prediction += tree.predict(row);
        }
        let round_rmse = rmse(&predictions, dataset.y);
        tracing::debug!(round, rmse = round_rmse, leaves = tree.leaf_count(), "Boosting round");
        train_rmse.push(round_rmse);
        trees.push(tree);
    }

    Ok(TrainReport {
        model: GbdtRegressor {
            model_version: MODEL_VERSION,
            objective: OBJECTIVE.to_string(),
            feature_names: dataset.feature_names.to_vec(),
            base_score,
            learning_rate: options.learning_rate,
            max_depth: options.max_depth,
            trees,
        },
        train_rmse,
    })
}

fn validate_dataset(dataset: &TrainDataset<'_>) -> Result<(), GbdtError> {
    if dataset.x.len() != dataset.y.len() {
        return Err(GbdtError::LengthMismatch {
            rows: dataset.x.len(),
            targets: dataset.y.len(),
        });
    }
    if dataset.x.is_empty() {
        return Err(GbdtError::EmptyDataset);
    }
    let width = dataset.feature_names.len();
    if width == 0 {
        return Err(GbdtError::InvalidParam {
            name: "feature_names",
            reason: "at least one feature is required".to_string(),
        });
    }
    for (row, features) in dataset.x.iter().enumerate() {
        if features.len() != width {
            return Err(GbdtError::RaggedRow {
                row,
                expected: width,
                actual: features.len(),
            });
        }
    }
    if let Some(row) = dataset.y.iter().position(|y| !y.is_finite()) {
        return Err(GbdtError::NonFiniteTarget { row });
    }
    Ok(())
}

fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    let sse: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (p - y) * (p - y))
        .sum();
    (sse / targets.len() as f64).sqrt()
}

struct TreeGrower<'a> {
    binned: &'a [Vec<u8>],
    cuts: &'a [FeatureCuts],
    options: &'a TrainOptions,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

impl TreeGrower<'_> {
    fn grow(&self, grads: &[f64], hess: &[f64]) -> RegressionTree {
        let mut nodes = Vec::new();
        let rows: Vec<usize> = (0..grads.len()).collect();
        self.build_node(rows, 0, grads, hess, &mut nodes);
        RegressionTree { nodes }
    }

    fn build_node(
        &self,
        rows: Vec<usize>,
        depth: usize,
        grads: &[f64],
        hess: &[f64],
        nodes: &mut Vec<Node>,
    ) -> usize {
        let g_sum: f64 = rows.iter().map(|&i| grads[i]).sum();
        let h_sum: f64 = rows.iter().map(|&i| hess[i]).sum();
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            value: 0.0,
            cover: h_sum,
        });

        if depth < self.options.max_depth
            && let Some(split) = self.best_split(&rows, grads, hess, g_sum, h_sum)
        {
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&i| (self.binned[i][split.feature] as usize) <= split.bin);
            let left = self.build_node(left_rows, depth + 1, grads, hess, nodes);
            let right = self.build_node(right_rows, depth + 1, grads, hess, nodes);
            nodes[idx] = Node::Split {
                feature: split.feature,
                threshold: self.cuts[split.feature].threshold(split.bin),
                left,
                right,
                gain: split.gain,
                cover: h_sum,
            };
            return idx;
        }

        nodes[idx] = Node::Leaf {
            value: self.leaf_weight(g_sum, h_sum),
            cover: h_sum,
        };
        idx
    }

    fn leaf_weight(&self, g_sum: f64, h_sum: f64) -> f64 {
        -g_sum / (h_sum + self.options.reg_lambda) * self.options.learning_rate
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.options.reg_lambda)
    }

    fn best_split(
        &self,
        rows: &[usize],
        grads: &[f64],
        hess: &[f64],
        g_sum: f64,
        h_sum: f64,
    ) -> Option<SplitCandidate> {
        let parent_score = self.score(g_sum, h_sum);
        let min_child = self.options.min_child_weight;
        let mut best: Option<SplitCandidate> = None;

        for (feature, cuts) in self.cuts.iter().enumerate() {
            let n_bins = cuts.n_bins();
            if n_bins < 2 {
                continue;
            }
            let mut hist_g = vec![0.0f64; n_bins];
            let mut hist_h = vec![0.0f64; n_bins];
            for &i in rows {
                let b = self.binned[i][feature] as usize;
                hist_g[b] += grads[i];
                hist_h[b] += hess[i];
            }

            let mut left_g = 0.0f64;
            let mut left_h = 0.0f64;
            for bin in 0..(n_bins - 1) {
                left_g += hist_g[bin];
                left_h += hist_h[bin];
                let right_g = g_sum - left_g;
                let right_h = h_sum - left_h;
                if left_h < min_child || right_h < min_child {
                    continue;
                }
                // An empty side cannot split anything.
                if left_h == 0.0 || right_h == 0.0 {
                    continue;
                }
                let gain = 0.5
                    * (self.score(left_g, left_h) + self.score(right_g, right_h) - parent_score)
                    - self.options.gamma;
                if gain > MIN_SPLIT_GAIN && best.is_none_or(|b| gain > b.gain) {
                    best = Some(SplitCandidate { feature, bin, gain });
                }
            }
        }
        best
    }
}
