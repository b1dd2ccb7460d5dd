use std::path::{Path, PathBuf};

use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::util::{
    create_parent_if_needed, map_sql_error, normalize_relative_path, now_millis, path_to_db,
};
use super::{ArtifactEntry, Experiment, RunInfo, RunStatus, TrackingError, TrackingStore};

impl TrackingStore {
    /// Look up an experiment by name, creating it on first use.
    ///
    /// New experiments store artifacts under `<artifact_root>/<experiment_id>`.
    pub fn get_or_create_experiment(&self, name: &str) -> Result<Experiment, TrackingError> {
        if let Some(existing) = self.experiment_by_name(name)? {
            return Ok(existing);
        }
        let tx = self
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        let creation_time = now_millis();
        tx.execute(
            "INSERT INTO experiments (name, artifact_location, creation_time) VALUES (?1, '', ?2)",
            params![name, creation_time],
        )
        .map_err(map_sql_error)?;
        let experiment_id = tx.last_insert_rowid();
        let artifact_location = self.artifact_root.join(experiment_id.to_string());
        tx.execute(
            "UPDATE experiments SET artifact_location = ?1 WHERE experiment_id = ?2",
            params![path_to_db(&artifact_location), experiment_id],
        )
        .map_err(map_sql_error)?;
        tx.commit().map_err(map_sql_error)?;
        tracing::info!(experiment_id, name, "Created experiment");
        Ok(Experiment {
            experiment_id,
            name: name.to_string(),
            artifact_location,
            creation_time,
        })
    }

    /// Start a new `RUNNING` run in the experiment.
    pub fn start_run(
        &self,
        experiment: &Experiment,
        run_name: Option<&str>,
    ) -> Result<ActiveRun<'_>, TrackingError> {
        let run_id = Uuid::new_v4().simple().to_string();
        let artifact_uri = experiment
            .artifact_location
            .join(&run_id)
            .join("artifacts");
        let start_time = now_millis();
        self.connection
            .execute(
                "INSERT INTO runs (run_uuid, experiment_id, name, status, start_time, artifact_uri)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id,
                    experiment.experiment_id,
                    run_name,
                    RunStatus::Running.as_str(),
                    start_time,
                    path_to_db(&artifact_uri)
                ],
            )
            .map_err(map_sql_error)?;
        tracing::info!(run_id = %run_id, experiment = %experiment.name, "Started run");
        Ok(ActiveRun {
            store: self,
            info: RunInfo {
                run_id,
                experiment_id: experiment.experiment_id,
                run_name: run_name.map(str::to_string),
                status: RunStatus::Running,
                start_time,
                end_time: None,
                artifact_uri,
            },
            ended: false,
        })
    }

    /// Run `body` inside a fresh run.
    ///
    /// The run ends `FINISHED` when `body` returns `Ok` and `FAILED` when it
    /// returns `Err` or unwinds.
    pub fn with_run<T, E, F>(
        &self,
        experiment: &Experiment,
        run_name: Option<&str>,
        body: F,
    ) -> Result<T, E>
    where
        E: From<TrackingError>,
        F: FnOnce(&mut ActiveRun<'_>) -> Result<T, E>,
    {
        let mut run = self.start_run(experiment, run_name)?;
        match body(&mut run) {
            Ok(value) => {
                run.finish()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(end_err) = run.fail() {
                    tracing::warn!("Could not mark run as failed: {end_err}");
                }
                Err(err)
            }
        }
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<i64, TrackingError> {
        let end_time = now_millis();
        let changed = self
            .connection
            .execute(
                "UPDATE runs SET status = ?1, end_time = ?2
                 WHERE run_uuid = ?3 AND status = ?4",
                params![
                    status.as_str(),
                    end_time,
                    run_id,
                    RunStatus::Running.as_str()
                ],
            )
            .map_err(map_sql_error)?;
        if changed == 0 {
            return Err(TrackingError::RunEnded(run_id.to_string()));
        }
        Ok(end_time)
    }

    fn ensure_running(&self, run_id: &str) -> Result<(), TrackingError> {
        let status: Option<String> = self
            .connection
            .query_row(
                "SELECT status FROM runs WHERE run_uuid = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)?;
        match status {
            None => Err(TrackingError::RunNotFound(run_id.to_string())),
            Some(status) if status == RunStatus::Running.as_str() => Ok(()),
            Some(_) => Err(TrackingError::RunEnded(run_id.to_string())),
        }
    }
}

/// Handle to a `RUNNING` run; the only way to write params, metrics, tags
/// and artifacts.
///
/// Dropping the handle without calling [`ActiveRun::finish`] or
/// [`ActiveRun::fail`] marks the run `FAILED`.
pub struct ActiveRun<'store> {
    store: &'store TrackingStore,
    info: RunInfo,
    ended: bool,
}

impl ActiveRun<'_> {
    pub fn run_id(&self) -> &str {
        &self.info.run_id
    }

    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn store(&self) -> &TrackingStore {
        self.store
    }

    /// Record a param. Re-logging the same value is a no-op; a different
    /// value is rejected.
    pub fn log_param(&mut self, key: &str, value: &str) -> Result<(), TrackingError> {
        self.store.ensure_running(&self.info.run_id)?;
        let connection = &self.store.connection;
        let existing: Option<String> = connection
            .query_row(
                "SELECT value FROM params WHERE run_uuid = ?1 AND key = ?2",
                params![self.info.run_id, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)?;
        match existing {
            Some(existing) if existing == value => Ok(()),
            Some(existing) => Err(TrackingError::ParamConflict {
                key: key.to_string(),
                existing,
                attempted: value.to_string(),
            }),
            None => {
                connection
                    .execute(
                        "INSERT INTO params (run_uuid, key, value) VALUES (?1, ?2, ?3)",
                        params![self.info.run_id, key, value],
                    )
                    .map_err(map_sql_error)?;
                Ok(())
            }
        }
    }

    pub fn log_params<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = (&'a str, String)>,
    ) -> Result<(), TrackingError> {
        for (key, value) in pairs {
            self.log_param(key, &value)?;
        }
        Ok(())
    }

    pub fn log_metric(&mut self, key: &str, value: f64, step: i64) -> Result<(), TrackingError> {
        self.log_metric_history(key, &[value], step)
    }

    /// Record consecutive values of one metric starting at `first_step`, in
    /// a single transaction.
    pub fn log_metric_history(
        &mut self,
        key: &str,
        values: &[f64],
        first_step: i64,
    ) -> Result<(), TrackingError> {
        if let Some(&value) = values.iter().find(|v| !v.is_finite()) {
            return Err(TrackingError::NonFiniteMetric {
                key: key.to_string(),
                value,
            });
        }
        self.store.ensure_running(&self.info.run_id)?;
        let tx = self
            .store
            .connection
            .unchecked_transaction()
            .map_err(map_sql_error)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO metrics (run_uuid, key, value, step, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(map_sql_error)?;
            let timestamp = now_millis();
            for (offset, value) in values.iter().enumerate() {
                stmt.execute(params![
                    self.info.run_id,
                    key,
                    value,
                    first_step + offset as i64,
                    timestamp
                ])
                .map_err(map_sql_error)?;
            }
        }
        tx.commit().map_err(map_sql_error)
    }

    /// Set a tag, replacing any earlier value.
    pub fn set_tag(&mut self, key: &str, value: &str) -> Result<(), TrackingError> {
        self.store.ensure_running(&self.info.run_id)?;
        self.store
            .connection
            .execute(
                "INSERT INTO tags (run_uuid, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(run_uuid, key) DO UPDATE SET value = excluded.value",
                params![self.info.run_id, key, value],
            )
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Directory an artifact path resolves to for this run.
    pub fn artifact_uri(&self, relative_path: &Path) -> Result<PathBuf, TrackingError> {
        let normalized = normalize_relative_path(relative_path)?;
        Ok(self.info.artifact_uri.join(normalized))
    }

    /// Write `bytes` to `relative_path` under the run's artifact directory
    /// and record its size and digest.
    pub fn log_artifact_bytes(
        &mut self,
        relative_path: &Path,
        bytes: &[u8],
    ) -> Result<ArtifactEntry, TrackingError> {
        self.store.ensure_running(&self.info.run_id)?;
        let normalized = normalize_relative_path(relative_path)?;
        let destination = self.info.artifact_uri.join(&normalized);
        create_parent_if_needed(&destination)?;
        std::fs::write(&destination, bytes).map_err(|source| TrackingError::Io {
            path: destination.clone(),
            source,
        })?;
        let entry = ArtifactEntry {
            path: normalized,
            size: bytes.len() as u64,
            digest: blake3::hash(bytes).to_hex().to_string(),
        };
        self.store
            .connection
            .execute(
                "INSERT INTO artifacts (run_uuid, path, size, digest) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(run_uuid, path) DO UPDATE SET size = excluded.size,
                                                          digest = excluded.digest",
                params![self.info.run_id, entry.path, entry.size as i64, entry.digest],
            )
            .map_err(map_sql_error)?;
        tracing::debug!(run_id = %self.info.run_id, path = %entry.path, "Logged artifact");
        Ok(entry)
    }

    /// End the run as `FINISHED`.
    pub fn finish(mut self) -> Result<RunInfo, TrackingError> {
        self.end(RunStatus::Finished)
    }

    /// End the run as `FAILED`.
    pub fn fail(mut self) -> Result<RunInfo, TrackingError> {
        self.end(RunStatus::Failed)
    }

    fn end(&mut self, status: RunStatus) -> Result<RunInfo, TrackingError> {
        let end_time = match self.store.end_run(&self.info.run_id, status) {
            Ok(end_time) => end_time,
            // Another handle already ended it; nothing left to finalize.
            Err(err @ TrackingError::RunEnded(_)) => {
                self.ended = true;
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        self.ended = true;
        self.info.status = status;
        self.info.end_time = Some(end_time);
        tracing::info!(run_id = %self.info.run_id, status = %status, "Run ended");
        Ok(self.info.clone())
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        if let Err(err) = self.end(RunStatus::Failed) {
            tracing::warn!(run_id = %self.info.run_id, "Could not finalize abandoned run: {err}");
        }
    }
}
