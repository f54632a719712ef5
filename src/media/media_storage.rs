use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use walkdir::WalkDir;

/// Relative storage path for a task's upload.
pub fn relative_path(owner_id: Uuid, task_id: Uuid, filename: &str) -> String {
    format!("user_{}/task_{}/{}", owner_id, task_id, filename)
}

/// Local directory holding every task's media files.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Write via a temp file in the target directory and rename it into place,
    /// so readers never see a half-written file.
    pub async fn save(&self, relative: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.resolve(relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_file_name(format!(
            ".{}.{}.tmp",
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload"),
            Uuid::new_v4().simple()
        ));

        let mut file = tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await?;

        if let Err(e) = write_all_synced(&mut file, bytes).await {
            drop(file);
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }

    pub async fn read(&self, relative: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.resolve(relative)).await
    }

    /// Returns `false` when the file was already gone.
    pub async fn remove(&self, relative: &str) -> io::Result<bool> {
        match tokio::fs::remove_file(self.resolve(relative)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Relative paths of files last modified more than `min_age` ago.
    pub async fn files_older_than(&self, min_age: Duration) -> io::Result<Vec<String>> {
        let root = self.root.clone();

        tokio::task::spawn_blocking(move || -> io::Result<Vec<String>> {
            let cutoff = SystemTime::now()
                .checked_sub(min_age)
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let mut found = Vec::new();

            if !root.exists() {
                return Ok(found);
            }

            for entry in WalkDir::new(&root).min_depth(1) {
                let entry = entry.map_err(io::Error::other)?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let modified = entry.metadata().map_err(io::Error::other)?.modified()?;
                if modified > cutoff {
                    continue;
                }

                if let Ok(relative) = entry.path().strip_prefix(&root) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    found.push(parts.join("/"));
                }
            }

            Ok(found)
        })
        .await
        .map_err(io::Error::other)?
    }
}

async fn write_all_synced(file: &mut tokio::fs::File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_layout() {
        let owner = Uuid::new_v4();
        let task = Uuid::new_v4();
        assert_eq!(
            relative_path(owner, task, "a.png"),
            format!("user_{}/task_{}/a.png", owner, task)
        );
    }

    #[tokio::test]
    async fn test_save_overwrites_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());

        storage.save("user_1/task_1/a.txt", b"first").await.unwrap();
        storage.save("user_1/task_1/a.txt", b"second").await.unwrap();
        assert_eq!(storage.read("user_1/task_1/a.txt").await.unwrap(), b"second");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("user_1/task_1"))
            .unwrap()
            .collect();
        assert_eq!(leftovers.len(), 1);

        assert!(storage.remove("user_1/task_1/a.txt").await.unwrap());
        assert!(!storage.remove("user_1/task_1/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_stays_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());
        assert_eq!(
            storage.resolve("../../etc/passwd"),
            dir.path().join("etc").join("passwd")
        );
    }

    #[tokio::test]
    async fn test_files_older_than() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());
        storage.save("user_1/task_1/a.txt", b"a").await.unwrap();

        let all = storage.files_older_than(Duration::ZERO).await.unwrap();
        assert_eq!(all, vec!["user_1/task_1/a.txt".to_string()]);

        let none = storage
            .files_older_than(Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(none.is_empty());

        let missing = MediaStorage::new(dir.path().join("nope"));
        assert!(missing.files_older_than(Duration::ZERO).await.unwrap().is_empty());
    }
}
