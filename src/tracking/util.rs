use std::path::{Component, Path, PathBuf};

use super::TrackingError;

/// Translate rusqlite errors into friendlier TrackingError variants.
pub(super) fn map_sql_error(err: rusqlite::Error) -> TrackingError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.code == rusqlite::ErrorCode::DatabaseBusy
                || sql_err.code == rusqlite::ErrorCode::DatabaseLocked =>
        {
            TrackingError::Busy
        }
        other => TrackingError::Sql(other),
    }
}

/// Normalize an artifact path for storage, always `/`-separated.
///
/// Rejects absolute paths, parent traversal, root prefixes, and empty paths.
pub fn normalize_relative_path(path: &Path) -> Result<String, TrackingError> {
    if path.is_absolute() {
        return Err(TrackingError::InvalidArtifactPath(path.to_path_buf()));
    }
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(TrackingError::InvalidArtifactPath(path.to_path_buf()));
            }
        }
    }
    if parts.is_empty() {
        return Err(TrackingError::InvalidArtifactPath(path.to_path_buf()));
    }
    Ok(parts.join("/"))
}

pub(super) fn create_parent_if_needed(path: &Path) -> Result<(), TrackingError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| TrackingError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

pub(super) fn path_to_db(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub(super) fn path_from_db(value: String) -> PathBuf {
    PathBuf::from(value)
}

/// Current wall-clock time in epoch milliseconds.
pub(super) fn now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rejects_parent_and_absolute_paths() {
        let err = normalize_relative_path(Path::new("../escape.json")).unwrap_err();
        assert!(matches!(err, TrackingError::InvalidArtifactPath(_)));
        let absolute = std::env::current_dir().unwrap().join("model.json");
        let err = normalize_relative_path(&absolute).unwrap_err();
        assert!(matches!(err, TrackingError::InvalidArtifactPath(_)));
    }

    #[test]
    fn normalize_rejects_empty_and_curdir_only() {
        for path in ["", "."] {
            let err = normalize_relative_path(Path::new(path)).unwrap_err();
            assert!(matches!(err, TrackingError::InvalidArtifactPath(_)));
        }
    }

    #[test]
    fn normalize_skips_curdir_components() {
        let normalized = normalize_relative_path(Path::new("model/./model.json")).unwrap();
        assert_eq!(normalized, "model/model.json");
    }
}
