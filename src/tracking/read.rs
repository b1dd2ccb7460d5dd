use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{OptionalExtension, Row, params};

use super::uri::ModelUri;
use super::util::{map_sql_error, normalize_relative_path, path_from_db};
use super::{ArtifactEntry, Experiment, MetricPoint, RunInfo, TrackingError, TrackingStore};
use crate::ml::gbdt::GbdtRegressor;

/// File name of the serialized booster inside a model directory.
pub const MODEL_FILE_NAME: &str = "model.json";

const RUN_COLUMNS: &str =
    "run_uuid, experiment_id, name, status, start_time, end_time, artifact_uri";

impl TrackingStore {
    pub fn experiment_by_name(&self, name: &str) -> Result<Option<Experiment>, TrackingError> {
        self.connection
            .query_row(
                "SELECT experiment_id, name, artifact_location, creation_time
                 FROM experiments WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Experiment {
                        experiment_id: row.get(0)?,
                        name: row.get(1)?,
                        artifact_location: path_from_db(row.get(2)?),
                        creation_time: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(map_sql_error)
    }

    pub fn list_experiments(&self) -> Result<Vec<Experiment>, TrackingError> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT experiment_id, name, artifact_location, creation_time
                 FROM experiments ORDER BY experiment_id ASC",
            )
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Experiment {
                    experiment_id: row.get(0)?,
                    name: row.get(1)?,
                    artifact_location: path_from_db(row.get(2)?),
                    creation_time: row.get(3)?,
                })
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    pub fn get_run(&self, run_id: &str) -> Result<RunInfo, TrackingError> {
        let raw = self
            .connection
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_uuid = ?1"),
                params![run_id],
                raw_run,
            )
            .optional()
            .map_err(map_sql_error)?
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;
        raw.into_info()
    }

    /// Runs of an experiment, newest first.
    pub fn list_runs(&self, experiment_id: i64) -> Result<Vec<RunInfo>, TrackingError> {
        let mut stmt = self
            .connection
            .prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM runs WHERE experiment_id = ?1
                 ORDER BY start_time DESC, rowid DESC"
            ))
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![experiment_id], raw_run)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        rows.into_iter().map(RawRun::into_info).collect()
    }

    pub fn params(&self, run_id: &str) -> Result<BTreeMap<String, String>, TrackingError> {
        self.key_values("SELECT key, value FROM params WHERE run_uuid = ?1", run_id)
    }

    pub fn tags(&self, run_id: &str) -> Result<BTreeMap<String, String>, TrackingError> {
        self.key_values("SELECT key, value FROM tags WHERE run_uuid = ?1", run_id)
    }

    /// Value at the highest step of every metric key.
    pub fn latest_metrics(&self, run_id: &str) -> Result<BTreeMap<String, f64>, TrackingError> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT m.key, m.value FROM metrics m
                 WHERE m.run_uuid = ?1
                   AND m.id = (SELECT id FROM metrics
                               WHERE run_uuid = m.run_uuid AND key = m.key
                               ORDER BY step DESC, id DESC LIMIT 1)",
            )
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })
            .map_err(map_sql_error)?
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    /// Every recorded value of one metric, ordered by step.
    pub fn metric_history(
        &self,
        run_id: &str,
        key: &str,
    ) -> Result<Vec<MetricPoint>, TrackingError> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT key, value, step, timestamp FROM metrics
                 WHERE run_uuid = ?1 AND key = ?2 ORDER BY step ASC, id ASC",
            )
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![run_id, key], |row| {
                Ok(MetricPoint {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    step: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    pub fn artifacts(&self, run_id: &str) -> Result<Vec<ArtifactEntry>, TrackingError> {
        let mut stmt = self
            .connection
            .prepare("SELECT path, size, digest FROM artifacts WHERE run_uuid = ?1 ORDER BY path")
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(ArtifactEntry {
                    path: row.get(0)?,
                    size: row.get::<_, i64>(1)? as u64,
                    digest: row.get(2)?,
                })
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }

    /// Directory on disk that a `runs:/<run_id>/<path>` URI points at.
    pub fn resolve_model_uri(&self, uri: &str) -> Result<PathBuf, TrackingError> {
        let model_uri = ModelUri::parse(uri)?;
        let run = self.get_run(&model_uri.run_id)?;
        let relative = normalize_relative_path(Path::new(&model_uri.artifact_path))?;
        Ok(run.artifact_uri.join(relative))
    }

    /// Load the booster logged at a `runs:/` URI.
    pub fn load_model(&self, uri: &str) -> Result<GbdtRegressor, TrackingError> {
        let dir = self.resolve_model_uri(uri)?;
        Ok(GbdtRegressor::load_json(&dir.join(MODEL_FILE_NAME))?)
    }

    fn key_values(
        &self,
        sql: &str,
        run_id: &str,
    ) -> Result<BTreeMap<String, String>, TrackingError> {
        let mut stmt = self.connection.prepare(sql).map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(map_sql_error)?
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map_err(map_sql_error)?;
        Ok(rows)
    }
}

struct RawRun {
    run_id: String,
    experiment_id: i64,
    run_name: Option<String>,
    status: String,
    start_time: i64,
    end_time: Option<i64>,
    artifact_uri: String,
}

impl RawRun {
    fn into_info(self) -> Result<RunInfo, TrackingError> {
        Ok(RunInfo {
            status: self.status.parse()?,
            run_id: self.run_id,
            experiment_id: self.experiment_id,
            run_name: self.run_name,
            start_time: self.start_time,
            end_time: self.end_time,
            artifact_uri: path_from_db(self.artifact_uri),
        })
    }
}

fn raw_run(row: &Row<'_>) -> rusqlite::Result<RawRun> {
    Ok(RawRun {
        run_id: row.get(0)?,
        experiment_id: row.get(1)?,
        run_name: row.get(2)?,
        status: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        artifact_uri: row.get(6)?,
    })
}
