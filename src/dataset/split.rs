use rand::rngs::StdRng;
use rand::{SeedableRng, seq::SliceRandom};

use super::{Dataset, DatasetError};

/// Options for the seeded train/test partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitOptions {
    /// Fraction of rows assigned to training, in `(0, 1)`.
    pub train_fraction: f64,
    /// Seed for the row shuffle.
    pub seed: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            train_fraction: 0.7,
            seed: 0,
        }
    }
}

/// Disjoint, covering train/test partition with aligned targets.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    /// Source row index for each training row.
    pub train_indices: Vec<usize>,
    /// Source row index for each test row.
    pub test_indices: Vec<usize>,
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<f64>,
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<f64>,
}

/// Number of training rows for `rows` total: `floor(fraction * rows)`.
pub fn train_row_count(rows: usize, fraction: f64) -> usize {
    // Absorb float noise such as 0.7 * 10 evaluating just below 7.
    ((fraction * rows as f64) + 1e-9).floor() as usize
}

/// Shuffle row indices with `options.seed` and cut at the training fraction.
pub fn train_test_split(
    dataset: &Dataset,
    options: &SplitOptions,
) -> Result<TrainTestSplit, DatasetError> {
    if !(options.train_fraction > 0.0 && options.train_fraction < 1.0) {
        return Err(DatasetError::SplitFraction(options.train_fraction));
    }
    let n = dataset.len();
    let n_train = train_row_count(n, options.train_fraction);
    if n_train == 0 || n_train == n {
        return Err(DatasetError::TooFewRows {
            rows: n,
            train_fraction: options.train_fraction,
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(options.seed);
    indices.shuffle(&mut rng);
    let test_indices = indices.split_off(n_train);
    let train_indices = indices;

    let gather_x = |rows: &[usize]| -> Vec<Vec<f64>> {
        rows.iter().map(|&i| dataset.x[i].clone()).collect()
    };
    let gather_y = |rows: &[usize]| -> Vec<f64> { rows.iter().map(|&i| dataset.y[i]).collect() };
    Ok(TrainTestSplit {
        x_train: gather_x(&train_indices),
        y_train: gather_y(&train_indices),
        x_test: gather_x(&test_indices),
        y_test: gather_y(&test_indices),
        train_indices,
        test_indices,
    })
}
