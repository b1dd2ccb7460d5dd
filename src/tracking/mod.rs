//! Embedded experiment tracking backed by SQLite.
//!
//! Runs belong to named experiments and collect params, metric histories,
//! tags and file artifacts. Artifacts live on disk under the store's
//! artifact root; the database only records their paths and digests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fit-with-logging wrapper around the booster.
pub mod autolog;
/// Model evaluation that records its metrics on a run.
pub mod evaluate;
/// Read-only queries over experiments and runs.
pub mod read;
/// Active run guard and scoped run helper.
pub mod run;
mod schema;
mod uri;
mod util;

pub use evaluate::{EVAL_TABLE_ARTIFACT, EvaluationResult, evaluate};
pub use run::ActiveRun;
pub use uri::{ModelUri, TrackingUri};
pub use util::normalize_relative_path;

/// Errors returned by the tracking store.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// SQLite query failed.
    #[error("Tracking database query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Database is locked by another writer.
    #[error("Tracking database is busy, please retry")]
    Busy,
    #[error("Unsupported tracking URI {0:?}; expected sqlite:///<path>")]
    UnsupportedUri(String),
    #[error("Could not create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Params are write-once per run.
    #[error("Param {key} already logged as {existing:?}, refusing {attempted:?}")]
    ParamConflict {
        key: String,
        existing: String,
        attempted: String,
    },
    #[error("Metric {key} has non-finite value {value}")]
    NonFiniteMetric { key: String, value: f64 },
    #[error("Artifact path must be relative and free of '..': {0}")]
    InvalidArtifactPath(PathBuf),
    #[error("Run not found: {0}")]
    RunNotFound(String),
    #[error("Run {0} has already ended")]
    RunEnded(String),
    #[error("Invalid model URI {0:?}; expected runs:/<run_id>/<path>")]
    InvalidModelUri(String),
    #[error("Unknown run status {0:?}")]
    InvalidStatus(String),
    #[error(transparent)]
    Model(#[from] crate::ml::gbdt::GbdtError),
    #[error("Evaluation frame error: {0}")]
    Frame(#[from] crate::dataset::DatasetError),
    #[error("Evaluation failed: {0}")]
    Metrics(#[from] crate::ml::metrics::MetricsError),
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for RunStatus {
    type Err = TrackingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "RUNNING" => Ok(RunStatus::Running),
            "FINISHED" => Ok(RunStatus::Finished),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(TrackingError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named group of runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: i64,
    pub name: String,
    /// Directory holding one subdirectory per run.
    pub artifact_location: PathBuf,
    pub creation_time: i64,
}

/// Stored metadata for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: i64,
    pub run_name: Option<String>,
    pub status: RunStatus,
    /// Epoch milliseconds.
    pub start_time: i64,
    pub end_time: Option<i64>,
    /// Directory that artifacts of this run are written into.
    pub artifact_uri: PathBuf,
}

/// One recorded metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub key: String,
    pub value: f64,
    pub step: i64,
    pub timestamp: i64,
}

/// Artifact file recorded against a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Path relative to the run's artifact directory, `/`-separated.
    pub path: String,
    pub size: u64,
    /// Hex blake3 digest of the file contents.
    pub digest: String,
}

/// SQLite tracking database plus the directory artifacts are written to.
pub struct TrackingStore {
    connection: Connection,
    db_path: PathBuf,
    artifact_root: PathBuf,
}

impl TrackingStore {
    /// Open (or create) the store named by `uri`.
    ///
    /// Without an explicit `artifact_root`, artifacts go to `mlruns` beside
    /// the database file.
    pub fn open(uri: &TrackingUri, artifact_root: Option<&Path>) -> Result<Self, TrackingError> {
        let db_path = uri.db_path().to_path_buf();
        util::create_parent_if_needed(&db_path)?;
        let connection = Connection::open(&db_path).map_err(util::map_sql_error)?;
        let store = Self {
            connection,
            artifact_root: resolve_artifact_root(&db_path, artifact_root),
            db_path,
        };
        store.apply_pragmas()?;
        schema::apply_schema(&store.connection)?;
        tracing::debug!(db = %store.db_path.display(), "Opened tracking store");
        Ok(store)
    }

    /// Open an existing store without creating or migrating anything.
    pub fn open_read_only(uri: &TrackingUri) -> Result<Self, TrackingError> {
        let db_path = uri.db_path().to_path_buf();
        let connection = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(util::map_sql_error)?;
        connection
            .execute_batch("PRAGMA busy_timeout=5000;")
            .map_err(util::map_sql_error)?;
        Ok(Self {
            connection,
            artifact_root: resolve_artifact_root(&db_path, None),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn artifact_root(&self) -> &Path {
        &self.artifact_root
    }

    fn apply_pragmas(&self) -> Result<(), TrackingError> {
        self.connection
            .execute_batch(
                "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
            )
            .map_err(util::map_sql_error)
    }
}

fn resolve_artifact_root(db_path: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(root) => root.to_path_buf(),
        None => db_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("mlruns"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn open_temp_store(dir: &Path) -> TrackingStore {
        let uri = TrackingUri::from_path(dir.join("tracking.sqlite"));
        TrackingStore::open(&uri, None).unwrap()
    }

    #[test]
    fn open_creates_schema_and_wal_mode() {
        let dir = tempdir().unwrap();
        let store = open_temp_store(dir.path());
        let journal_mode: String = store
            .connection
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
        for table in ["experiments", "runs", "params", "metrics", "tags", "artifacts"] {
            let count: i64 = store
                .connection
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn default_artifact_root_sits_beside_database() {
        let dir = tempdir().unwrap();
        let store = open_temp_store(dir.path());
        assert_eq!(store.artifact_root(), dir.path().join("mlruns"));
    }

    #[test]
    fn run_status_round_trips_through_text() {
        for status in [RunStatus::Running, RunStatus::Finished, RunStatus::Failed] {
            assert_eq!(status.as_str().parse::<RunStatus>().unwrap(), status);
        }
        assert!(matches!(
            "DONE".parse::<RunStatus>(),
            Err(TrackingError::InvalidStatus(_))
        ));
    }
}
