//! Boosted-tree profit regression with embedded experiment tracking.
//!
//! [`pipeline::run`] loads the startup financials CSV, encodes the region
//! column, splits rows 70/30 with a fixed seed, fits a gradient-boosted
//! regressor while autologging to a SQLite tracking store, and evaluates the
//! logged model on the held-out rows.

/// Application directory resolution.
pub mod app_dirs;
/// Command-line argument parsing.
pub mod cli;
/// Run configuration layering.
pub mod config;
/// Dataset loading, encoding and splitting.
pub mod dataset;
/// Top-level error taxonomy.
pub mod error;
/// Tracing subscriber setup.
pub mod logging;
/// Booster and metrics.
pub mod ml;
/// The training run itself.
pub mod pipeline;
/// SQLite experiment tracking.
pub mod tracking;

pub use error::TrainerError;
pub use pipeline::{RunSummary, run};
