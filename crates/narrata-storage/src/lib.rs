//! Per-task filesystem workspace for generated media (spec §4.4 "Task
//! Storage"). Grounded on the atomic write-then-rename idiom in
//! `vclip-media/src/fs_utils.rs::move_file`, adapted from a cross-device
//! move helper into a scratch-dir-local write.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use narrata_models::{StorageError, TaskId};

/// The four subdirectories every task workspace has (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Images,
    Audio,
    Videos,
    Temp,
}

impl AssetKind {
    const ALL: [AssetKind; 4] = [
        AssetKind::Images,
        AssetKind::Audio,
        AssetKind::Videos,
        AssetKind::Temp,
    ];

    fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Images => "images",
            AssetKind::Audio => "audio",
            AssetKind::Videos => "videos",
            AssetKind::Temp => "temp",
        }
    }
}

/// A task's private directory tree under the storage root. Creation is
/// idempotent: calling `create` twice for the same task is a no-op past the
/// first call (spec §4.4 "creating it twice is a no-op").
#[derive(Debug, Clone)]
pub struct TaskWorkspace {
    root: PathBuf,
}

impl TaskWorkspace {
    /// Create (or reuse) the workspace for `task_id` under `base`.
    pub async fn create(base: impl AsRef<Path>, task_id: &TaskId) -> Result<Self, StorageError> {
        let root = base.as_ref().join(task_id.as_str());
        for kind in AssetKind::ALL {
            let dir = root.join(kind.dir_name());
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| StorageError {
                    path: dir.display().to_string(),
                    source,
                })?;
        }
        debug!(task_id = %task_id, root = %root.display(), "task workspace ready");
        Ok(Self { root })
    }

    /// The absolute path `filename` would have within `kind`, whether or not
    /// it has been written yet.
    pub fn path(&self, kind: AssetKind, filename: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(filename)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to `filename` under `kind`, atomically: the data lands
    /// in a sibling temp file first, then is renamed into place, so a reader
    /// never observes a partially written file.
    pub async fn write(
        &self,
        kind: AssetKind,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let dest = self.path(kind, filename);
        let tmp = dest.with_file_name(format!(
            "{}.{}.tmp",
            filename,
            Uuid::new_v4().simple()
        ));

        fs::write(&tmp, bytes)
            .await
            .map_err(|source| StorageError {
                path: tmp.display().to_string(),
                source,
            })?;

        fs::rename(&tmp, &dest).await.map_err(|source| {
            StorageError {
                path: dest.display().to_string(),
                source,
            }
        })?;

        Ok(dest)
    }

    /// Remove and recreate the `temp/` subdirectory, discarding intermediate
    /// files from the current run (spec §4.4 "clear_temp").
    pub async fn clear_temp(&self) -> Result<(), StorageError> {
        let temp = self.root.join(AssetKind::Temp.dir_name());
        match fs::remove_dir_all(&temp).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StorageError {
                    path: temp.display().to_string(),
                    source,
                })
            }
        }
        fs::create_dir_all(&temp)
            .await
            .map_err(|source| StorageError {
                path: temp.display().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_makes_all_four_subdirectories() {
        let base = tempfile::tempdir().unwrap();
        let task_id = TaskId::new();
        let workspace = TaskWorkspace::create(base.path(), &task_id).await.unwrap();

        for kind in AssetKind::ALL {
            assert!(workspace.root.join(kind.dir_name()).is_dir());
        }
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let task_id = TaskId::new();
        TaskWorkspace::create(base.path(), &task_id).await.unwrap();
        let workspace = TaskWorkspace::create(base.path(), &task_id).await.unwrap();
        assert!(workspace.path(AssetKind::Images, "x.png").starts_with(base.path()));
    }

    #[tokio::test]
    async fn write_then_read_round_trips_and_leaves_no_tmp_file() {
        let base = tempfile::tempdir().unwrap();
        let task_id = TaskId::new();
        let workspace = TaskWorkspace::create(base.path(), &task_id).await.unwrap();

        let path = workspace
            .write(AssetKind::Audio, "scene-1.mp3", b"audio-bytes")
            .await
            .unwrap();

        let contents = fs::read(&path).await.unwrap();
        assert_eq!(contents, b"audio-bytes");

        let mut entries = fs::read_dir(path.parent().unwrap()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().into_string().unwrap());
        }
        assert_eq!(names, vec!["scene-1.mp3"]);
    }

    #[tokio::test]
    async fn clear_temp_removes_files_but_keeps_other_dirs() {
        let base = tempfile::tempdir().unwrap();
        let task_id = TaskId::new();
        let workspace = TaskWorkspace::create(base.path(), &task_id).await.unwrap();

        workspace
            .write(AssetKind::Temp, "scratch.bin", b"x")
            .await
            .unwrap();
        workspace
            .write(AssetKind::Images, "keep.png", b"y")
            .await
            .unwrap();

        workspace.clear_temp().await.unwrap();

        assert!(!workspace.path(AssetKind::Temp, "scratch.bin").exists());
        assert!(workspace.path(AssetKind::Images, "keep.png").exists());
    }
}
