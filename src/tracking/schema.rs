use rusqlite::Connection;

use super::TrackingError;
use super::util::map_sql_error;

pub(super) fn apply_schema(connection: &Connection) -> Result<(), TrackingError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS experiments (
                experiment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                artifact_location TEXT NOT NULL,
                creation_time INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS runs (
                run_uuid TEXT PRIMARY KEY,
                experiment_id INTEGER NOT NULL,
                name TEXT,
                status TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER,
                artifact_uri TEXT NOT NULL,
                FOREIGN KEY(experiment_id) REFERENCES experiments(experiment_id)
             );
             CREATE INDEX IF NOT EXISTS idx_runs_experiment_start
                ON runs (experiment_id, start_time);
             CREATE TABLE IF NOT EXISTS params (
                run_uuid TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (run_uuid, key),
                FOREIGN KEY(run_uuid) REFERENCES runs(run_uuid) ON DELETE CASCADE
             ) WITHOUT ROWID;
             CREATE TABLE IF NOT EXISTS metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_uuid TEXT NOT NULL,
                key TEXT NOT NULL,
                value REAL NOT NULL,
                step INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                FOREIGN KEY(run_uuid) REFERENCES runs(run_uuid) ON DELETE CASCADE
             );
             CREATE INDEX IF NOT EXISTS idx_metrics_run_key_step
                ON metrics (run_uuid, key, step);
             CREATE TABLE IF NOT EXISTS tags (
                run_uuid TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (run_uuid, key),
                FOREIGN KEY(run_uuid) REFERENCES runs(run_uuid) ON DELETE CASCADE
             ) WITHOUT ROWID;
             CREATE TABLE IF NOT EXISTS artifacts (
                run_uuid TEXT NOT NULL,
                path TEXT NOT NULL,
                size INTEGER NOT NULL,
                digest TEXT NOT NULL,
                PRIMARY KEY (run_uuid, path),
                FOREIGN KEY(run_uuid) REFERENCES runs(run_uuid) ON DELETE CASCADE
             ) WITHOUT ROWID;",
        )
        .map_err(map_sql_error)
}
