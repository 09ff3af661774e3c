//! On-disk artifacts (fetched/uploaded images and reports).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Write `bytes` to `dir/file_name`, creating `dir` if needed.
///
/// Returns the full path as stored on the image record.
pub async fn save_artifact(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create {}: {e}", dir.display())))?;

    let path: PathBuf = dir.join(file_name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to write {}: {e}", path.display())))?;

    Ok(path.to_string_lossy().into_owned())
}

/// Whether a recorded artifact still exists on disk.
pub async fn artifact_exists(path: &str) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Delete every listed file, best effort.
///
/// Missing files are skipped silently; other failures are logged and never
/// propagated, so record deletion always proceeds.
pub async fn remove_artifacts(paths: &[String]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path, "Removed artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path, "Artifact already gone");
            }
            Err(e) => tracing::warn!(path = %path, error = %e, "Failed to remove artifact"),
        }
    }
}
