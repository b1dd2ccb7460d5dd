use std::fmt;
use std::path::{Path, PathBuf};

use super::TrackingError;

const SQLITE_PREFIX: &str = "sqlite:///";
const RUNS_PREFIX: &str = "runs:/";

/// Location of a tracking database, in `sqlite:///<path>` form.
///
/// Three slashes leave a relative path (`sqlite:///mydb.sqlite`); a fourth
/// makes it absolute (`sqlite:////var/db.sqlite`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingUri {
    db_path: PathBuf,
}

impl TrackingUri {
    pub fn parse(uri: &str) -> Result<Self, TrackingError> {
        let path = uri
            .strip_prefix(SQLITE_PREFIX)
            .filter(|rest| !rest.is_empty() && !rest.ends_with('/'))
            .ok_or_else(|| TrackingError::UnsupportedUri(uri.to_string()))?;
        Ok(Self {
            db_path: PathBuf::from(path),
        })
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl fmt::Display for TrackingUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SQLITE_PREFIX}{}", self.db_path.display())
    }
}

/// Reference to an artifact directory of a run: `runs:/<run_id>/<path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUri {
    pub run_id: String,
    pub artifact_path: String,
}

impl ModelUri {
    pub fn new(run_id: &str, artifact_path: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            artifact_path: artifact_path.to_string(),
        }
    }

    pub fn parse(uri: &str) -> Result<Self, TrackingError> {
        let invalid = || TrackingError::InvalidModelUri(uri.to_string());
        let rest = uri.strip_prefix(RUNS_PREFIX).ok_or_else(invalid)?;
        let (run_id, artifact_path) = rest.split_once('/').ok_or_else(invalid)?;
        let artifact_path = artifact_path.trim_end_matches('/');
        if run_id.is_empty() || artifact_path.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(run_id, artifact_path))
    }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RUNS_PREFIX}{}/{}", self.run_id, self.artifact_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relative_and_absolute_sqlite_uris() {
        let relative = TrackingUri::parse("sqlite:///mydb.sqlite").unwrap();
        assert_eq!(relative.db_path(), Path::new("mydb.sqlite"));
        assert_eq!(relative.to_string(), "sqlite:///mydb.sqlite");

        let absolute = TrackingUri::parse("sqlite:////tmp/runs/db.sqlite").unwrap();
        assert_eq!(absolute.db_path(), Path::new("/tmp/runs/db.sqlite"));
    }

    #[test]
    fn rejects_other_schemes_and_empty_paths() {
        for uri in [
            "http://localhost:5000",
            "file:///tmp/mlruns",
            "sqlite://mydb.sqlite",
            "sqlite:///",
            "mydb.sqlite",
        ] {
            assert!(
                matches!(TrackingUri::parse(uri), Err(TrackingError::UnsupportedUri(_))),
                "{uri} should be rejected"
            );
        }
    }

    #[test]
    fn model_uri_splits_run_and_path() {
        let uri = ModelUri::parse("runs:/abc123/model").unwrap();
        assert_eq!(uri.run_id, "abc123");
        assert_eq!(uri.artifact_path, "model");
        assert_eq!(uri.to_string(), "runs:/abc123/model");
        assert_eq!(
            ModelUri::parse("runs:/abc123/nested/model/").unwrap().artifact_path,
            "nested/model"
        );
        for bad in ["runs:/abc123", "runs://model", "models:/x/1", "runs:/abc/"] {
            assert!(matches!(
                ModelUri::parse(bad),
                Err(TrackingError::InvalidModelUri(_))
            ));
        }
    }
}
