use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::media_models::{MediaDeletion, TaskMedia, Upload, ALLOWED_EXTENSIONS, MAX_UPLOAD_BYTES};
use super::media_repository::MediaStore;
use super::media_storage::{relative_path, MediaStorage};
use crate::authz::authorize;
use crate::error::{AppError, Result};
use crate::task::Task;

/// Reduce a client-supplied name to its last path component and a safe
/// character set. Letters and digits of any script are kept. A name whose
/// stem is lost entirely becomes `file.<ext>`; `None` if nothing usable is left.
pub fn sanitize_filename(original: &str) -> Option<String> {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && stem.trim_start_matches('.').is_empty() => {
            Some(format!("file.{}", ext))
        }
        _ => {
            let name = cleaned.trim_start_matches('.');
            (!name.is_empty()).then(|| name.to_string())
        }
    }
}

/// Check size and extension; returns the name the file will be stored under.
pub fn validate_upload(upload: &Upload) -> Result<String> {
    let filename = sanitize_filename(&upload.filename).ok_or_else(|| {
        AppError::Validation(format!("{:?}: not a valid file name", upload.filename))
    })?;

    let extension = Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "{}: file extension {:?} is not allowed. Allowed extensions are: {}.",
            upload.filename,
            extension,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    if upload.size() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "{}: each file must be under 10MB.",
            upload.filename
        )));
    }

    Ok(filename)
}

/// Validate a whole batch without touching storage.
pub fn validate_uploads(uploads: &[Upload]) -> Result<()> {
    uploads.iter().try_for_each(|u| validate_upload(u).map(|_| ()))
}

#[derive(Clone)]
pub struct MediaService {
    repo: Arc<dyn MediaStore>,
    storage: MediaStorage,
}

impl MediaService {
    pub fn new(repo: Arc<dyn MediaStore>, storage: MediaStorage) -> Self {
        Self { repo, storage }
    }

    pub fn storage(&self) -> &MediaStorage {
        &self.storage
    }

    pub async fn attach(&self, user_id: Uuid, task: &Task, upload: &Upload) -> Result<TaskMedia> {
        authorize(user_id, task).require("task")?;
        self.store_upload(task, upload).await
    }

    /// Attach files in order, stopping at the first failure. Files before the
    /// failing one stay attached; later ones are never looked at.
    /// A requester who does not own the task is refused before any file.
    pub async fn attach_many(
        &self,
        user_id: Uuid,
        task: &Task,
        uploads: &[Upload],
    ) -> Result<Vec<TaskMedia>> {
        authorize(user_id, task).require("task")?;

        let mut attached = Vec::with_capacity(uploads.len());
        for (index, upload) in uploads.iter().enumerate() {
            match self.attach(user_id, task, upload).await {
                Ok(media) => attached.push(media),
                Err(e) => {
                    tracing::warn!(
                        task_id = %task.id,
                        attached = attached.len(),
                        skipped = uploads.len() - index - 1,
                        "Stopped attaching at {:?}: {}",
                        upload.filename,
                        e
                    );
                    return Err(e);
                }
            }
        }

        Ok(attached)
    }

    async fn store_upload(&self, task: &Task, upload: &Upload) -> Result<TaskMedia> {
        let filename = validate_upload(upload)?;
        let path = relative_path(task.user_id, task.id, &filename);

        self.storage.save(&path, &upload.bytes).await?;

        match self.repo.upsert(task.id, &path).await {
            Ok(media) => {
                tracing::debug!(task_id = %task.id, media_id = %media.id, "Stored {}", path);
                Ok(media)
            }
            Err(e) => {
                // Written file has no record; drop it rather than leave an orphan.
                if let Err(rm) = self.storage.remove(&path).await {
                    tracing::warn!("Failed to remove unrecorded file {}: {}", path, rm);
                }
                Err(e)
            }
        }
    }

    pub async fn list_for_task(&self, task_id: Uuid) -> Result<Vec<TaskMedia>> {
        self.repo.find_by_task(task_id).await
    }

    /// Delete a file the requester owns. Anyone else gets a silent no-op.
    pub async fn delete(&self, user_id: Uuid, media_id: Uuid) -> Result<MediaDeletion> {
        let record = self
            .repo
            .find_by_id(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".into()))?;

        if !authorize(user_id, &record).is_allowed() {
            tracing::warn!(%user_id, %media_id, "Ignoring delete of a file owned by someone else");
            return Ok(MediaDeletion::Ignored);
        }

        self.repo.delete(record.media.id).await?;
        self.remove_stored_files(std::slice::from_ref(&record.media)).await;

        Ok(MediaDeletion::Deleted)
    }

    /// Load a file's bytes for its owner.
    pub async fn open(&self, user_id: Uuid, media_id: Uuid) -> Result<(TaskMedia, Vec<u8>)> {
        let record = self
            .repo
            .find_by_id(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".into()))?;

        authorize(user_id, &record).require("file")?;

        let bytes = self
            .storage
            .read(&record.media.file_path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => AppError::NotFound("File not found".into()),
                _ => AppError::Storage(e),
            })?;

        Ok((record.media, bytes))
    }

    /// Best effort: records are already gone, leftovers are picked up by the sweeper.
    pub async fn remove_stored_files(&self, media: &[TaskMedia]) {
        for m in media {
            if let Err(e) = self.storage.remove(&m.file_path).await {
                tracing::warn!("Failed to remove {}: {}", m.file_path, e);
            }
        }
    }

    /// Remove stored files no record points at and older than `grace`.
    pub async fn sweep_orphans(&self, grace: Duration) -> Result<usize> {
        let referenced: HashSet<String> = self.repo.all_file_paths().await?.into_iter().collect();
        let candidates = self.storage.files_older_than(grace).await?;

        let mut removed = 0;
        for path in candidates.iter().filter(|p| !referenced.contains(*p)) {
            match self.storage.remove(path).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to remove orphan {}: {}", path, e),
            }
        }

        Ok(removed)
    }
}
