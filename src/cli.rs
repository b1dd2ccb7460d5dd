//! Command-line arguments for the training binary.

use clap::Parser;

use crate::error::TrainerError;

/// Train a boosted-tree profit model and log it to the tracking store.
#[derive(Debug, Clone, Parser)]
#[command(name = "profitboost", version, about)]
pub struct Args {
    /// Number of boosting rounds (positive integer).
    #[arg(long = "n_estimators", value_name = "N")]
    pub n_estimators: String,
    /// Maximum tree depth (positive integer).
    #[arg(long = "max_depth", value_name = "D")]
    pub max_depth: String,
}

/// The two user-supplied booster hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HyperParams {
    pub n_estimators: usize,
    pub max_depth: usize,
}

impl HyperParams {
    /// Convert raw argument strings, rejecting anything but positive integers.
    pub fn parse(n_estimators: &str, max_depth: &str) -> Result<Self, TrainerError> {
        Ok(Self {
            n_estimators: positive("n_estimators", n_estimators)?,
            max_depth: positive("max_depth", max_depth)?,
        })
    }
}

impl TryFrom<&Args> for HyperParams {
    type Error = TrainerError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        Self::parse(&args.n_estimators, &args.max_depth)
    }
}

fn positive(name: &'static str, raw: &str) -> Result<usize, TrainerError> {
    let invalid = |reason: String| TrainerError::Argument {
        name,
        value: raw.to_string(),
        reason,
    };
    let value: usize = raw
        .trim()
        .parse()
        .map_err(|err: std::num::ParseIntError| invalid(err.to_string()))?;
    if value == 0 {
        return Err(invalid("must be at least 1".to_string()));
    }
    Ok(value)
}
