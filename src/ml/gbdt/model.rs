use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::GbdtError;

/// Model format version written to JSON.
pub const MODEL_VERSION: i64 = 1;
/// Objective identifier, in XGBoost naming.
pub const OBJECTIVE: &str = "reg:squarederror";

/// Tree node stored in a flat arena; children are indices into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        /// Rows with `value <= threshold` (or a non-finite value) go left.
        threshold: f64,
        left: usize,
        right: usize,
        /// Loss reduction achieved by this split.
        gain: f64,
        /// Hessian sum of the rows reaching the node.
        cover: f64,
    },
    Leaf {
        /// Leaf weight, already scaled by the learning rate.
        value: f64,
        cover: f64,
    },
}

/// Regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<Node>,
}

impl RegressionTree {
    /// Walk from the root to a leaf.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let value = features.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if value > *threshold { *right } else { *left };
                }
            }
        }
    }

    /// Number of split levels on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Every child index must point forward into the arena so walks terminate.
    fn validate(&self, tree_idx: usize, n_features: usize) -> Result<(), GbdtError> {
        let invalid = |reason: String| GbdtError::InvalidModel(format!("tree {tree_idx}: {reason}"));
        if self.nodes.is_empty() {
            return Err(invalid("no nodes".to_string()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(invalid(format!("node {idx} uses feature {feature}")));
                }
                if !threshold.is_finite() {
                    return Err(invalid(format!("node {idx} has non-finite threshold")));
                }
                for child in [*left, *right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(invalid(format!("node {idx} has child {child}")));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Gradient-boosted regression trees with squared-error loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtRegressor {
    /// Model format version.
    pub model_version: i64,
    pub objective: String,
    /// Feature names in the order `predict` expects values.
    pub feature_names: Vec<String>,
    /// Initial prediction before any tree contributes.
    pub base_score: f64,
    /// Shrinkage already folded into leaf values; kept for reference.
    pub learning_rate: f64,
    pub max_depth: usize,
    pub trees: Vec<RegressionTree>,
}

/// Which per-feature statistic to aggregate over split nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportanceKind {
    /// Total loss reduction contributed by splits on the feature.
    Gain,
    /// Number of splits on the feature.
    Weight,
}

impl ImportanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportanceKind::Gain => "gain",
            ImportanceKind::Weight => "weight",
        }
    }
}

impl GbdtRegressor {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), GbdtError> {
        if self.model_version != MODEL_VERSION {
            return Err(GbdtError::InvalidModel(format!(
                "unsupported model_version {} (expected {MODEL_VERSION})",
                self.model_version
            )));
        }
        if self.objective != OBJECTIVE {
            return Err(GbdtError::InvalidModel(format!(
                "unsupported objective {:?}",
                self.objective
            )));
        }
        if self.feature_names.is_empty() {
            return Err(GbdtError::InvalidModel("no feature names".to_string()));
        }
        if !self.base_score.is_finite() {
            return Err(GbdtError::InvalidModel("non-finite base_score".to_string()));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(idx, self.feature_names.len())?;
        }
        Ok(())
    }

    /// Load and validate a model from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, GbdtError> {
        let bytes = std::fs::read(path).map_err(|source| GbdtError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_slice(&bytes)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, GbdtError> {
        let model: Self = serde_json::from_slice(bytes)?;
        model.validate()?;
        Ok(model)
    }

    /// Pretty-printed JSON bytes.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, GbdtError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Predict one row of features in `feature_names` order.
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.predict(features))
    }

    /// Predict many rows, checking row width against the model.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, GbdtError> {
        let width = self.feature_names.len();
        rows.iter()
            .enumerate()
            .map(|(row, features)| {
                if features.len() != width {
                    return Err(GbdtError::RaggedRow {
                        row,
                        expected: width,
                        actual: features.len(),
                    });
                }
                Ok(self.predict(features))
            })
            .collect()
    }

    /// Per-feature importance; features never split on report zero.
    pub fn feature_importance(&self, kind: ImportanceKind) -> BTreeMap<String, f64> {
        let mut totals = vec![0.0f64; self.feature_names.len()];
        for node in self.trees.iter().flat_map(|tree| &tree.nodes) {
            if let Node::Split { feature, gain, .. } = node
                && let Some(total) = totals.get_mut(*feature)
            {
                *total += match kind {
                    ImportanceKind::Gain => *gain,
                    ImportanceKind::Weight => 1.0,
                };
            }
        }
        self.feature_names.iter().cloned().zip(totals).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> RegressionTree {
        RegressionTree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    gain: 4.0,
                    cover: 2.0,
                },
                Node::Leaf {
                    value: left,
                    cover: 1.0,
                },
                Node::Leaf {
                    value: right,
                    cover: 1.0,
                },
            ],
        }
    }

    fn sample_model() -> GbdtRegressor {
        GbdtRegressor {
            model_version: MODEL_VERSION,
            objective: OBJECTIVE.to_string(),
            feature_names: vec!["a".into(), "b".into()],
            base_score: 10.0,
            learning_rate: 0.3,
            max_depth: 1,
            trees: vec![stump(0, 0.5, -1.0, 2.0), stump(1, 5.0, 0.25, 0.5)],
        }
    }

    #[test]
    fn tree_predict_branches_and_sends_nan_left() {
        let tree = stump(0, 0.5, -1.0, 2.0);
        assert_eq!(tree.predict(&[0.0]), -1.0);
        assert_eq!(tree.predict(&[0.5]), -1.0);
        assert_eq!(tree.predict(&[0.6]), 2.0);
        assert_eq!(tree.predict(&[f64::NAN]), -1.0);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn model_sums_base_score_and_trees() {
        let model = sample_model();
        assert_eq!(model.predict(&[1.0, 1.0]), 10.0 + 2.0 + 0.25);
        assert_eq!(model.predict_batch(&[vec![0.0, 9.0]]).unwrap(), vec![9.5]);
        assert!(matches!(
            model.predict_batch(&[vec![0.0]]),
            Err(GbdtError::RaggedRow { row: 0, .. })
        ));
    }

    #[test]
    fn json_round_trip_validates() {
        let model = sample_model();
        let bytes = model.to_json_vec().unwrap();
        let loaded = GbdtRegressor::from_json_slice(&bytes).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn validate_rejects_backward_children_and_unknown_features() {
        let mut model = sample_model();
        model.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
            gain: 1.0,
            cover: 1.0,
        };
        assert!(matches!(model.validate(), Err(GbdtError::InvalidModel(_))));

        let mut model = sample_model();
        model.trees[1] = stump(7, 0.0, 0.0, 0.0);
        assert!(matches!(model.validate(), Err(GbdtError::InvalidModel(_))));
    }

    #[test]
    fn importance_covers_every_feature() {
        let mut model = sample_model();
        model.trees.push(stump(0, 1.0, 0.0, 0.0));
        let gain = model.feature_importance(ImportanceKind::Gain);
        assert_eq!(gain["a"], 8.0);
        assert_eq!(gain["b"], 4.0);
        let weight = model.feature_importance(ImportanceKind::Weight);
        assert_eq!(weight["a"], 2.0);
        assert_eq!(weight["b"], 1.0);
    }
}
