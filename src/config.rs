//! Run configuration: built-in defaults, an optional TOML file, then
//! environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "profitboost.toml";
/// Names an alternative config file.
pub const CONFIG_ENV: &str = "PROFITBOOST_CONFIG";
pub const DATASET_ENV: &str = "PROFITBOOST_DATASET";
pub const TRACKING_URI_ENV: &str = "PROFITBOOST_TRACKING_URI";
pub const EXPERIMENT_ENV: &str = "PROFITBOOST_EXPERIMENT";
pub const ARTIFACT_ROOT_ENV: &str = "PROFITBOOST_ARTIFACT_ROOT";

pub const DEFAULT_DATASET: &str = "startups_profit.csv";
pub const DEFAULT_TRACKING_URI: &str = "sqlite:///mydb.sqlite";
pub const DEFAULT_EXPERIMENT: &str = "PotentialStartups";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Everything a training run needs besides its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub dataset_path: PathBuf,
    /// `sqlite:///<path>` location of the tracking database.
    pub tracking_uri: String,
    pub experiment_name: String,
    /// Where run artifacts are written; `mlruns` beside the database when unset.
    pub artifact_root: Option<PathBuf>,
    pub run_name: Option<String>,
    pub split_seed: u64,
    pub train_fraction: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET),
            tracking_uri: DEFAULT_TRACKING_URI.to_string(),
            experiment_name: DEFAULT_EXPERIMENT.to_string(),
            artifact_root: None,
            run_name: None,
            split_seed: 0,
            train_fraction: 0.7,
        }
    }
}

impl RunConfig {
    /// Resolve configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(Path::new(CONFIG_FILE_NAME), |key| std::env::var(key).ok())
    }

    /// Resolve configuration with `default_file` as the fallback config file
    /// and `env` supplying variable lookups.
    pub fn from_sources(
        default_file: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let explicit = env(CONFIG_ENV).filter(|value| !value.is_empty());
        let mut config = match explicit {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if default_file.exists() => Self::from_file(default_file)?,
            None => Self::default(),
        };
        config.apply_env(env);
        Ok(config)
    }

    /// Parse a TOML config file; absent keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded run config");
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| env(key).filter(|value| !value.is_empty());
        if let Some(value) = var(DATASET_ENV) {
            self.dataset_path = PathBuf::from(value);
        }
        if let Some(value) = var(TRACKING_URI_ENV) {
            self.tracking_uri = value;
        }
        if let Some(value) = var(EXPERIMENT_ENV) {
            self.experiment_name = value;
        }
        if let Some(value) = var(ARTIFACT_ROOT_ENV) {
            self.artifact_root = Some(PathBuf::from(value));
        }
    }
}
