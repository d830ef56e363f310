use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Snapshot, SnapshotStore};
use crate::Result;
use crate::utils::fs::{ensure_parent_dir, io_error};

/// JSON file snapshot store.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        ensure_parent_dir(&self.path).await?;

        // Write atomically using a temp file
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &json)
            .await
            .map_err(|e| io_error("writing snapshot", &temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| io_error("renaming snapshot", &self.path, e))?;

        info!(
            path = %self.path.display(),
            targets = snapshot.targets.len(),
            "Snapshot written"
        );
        Ok(())
    }

    async fn read_once(&self) -> Result<Option<Snapshot>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No snapshot found");
                return Ok(None);
            }
            Err(e) => return Err(io_error("reading snapshot", &self.path, e)),
        };

        tokio::fs::remove_file(&self.path)
            .await
            .map_err(|e| io_error("removing snapshot", &self.path, e))?;

        match serde_json::from_str::<Snapshot>(&json) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt snapshot");
                Ok(None)
            }
        }
    }
}
