use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Owned;

/// Largest accepted upload: 10 MiB.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["pdf", "jpg", "jpeg", "png", "docx", "txt"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TaskMedia {
    pub id: Uuid,
    pub task_id: Uuid,
    /// Relative to the media root: `user_<owner>/task_<task>/<filename>`.
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

impl TaskMedia {
    pub fn filename(&self) -> &str {
        self.file_path
            .rsplit('/')
            .next()
            .unwrap_or(self.file_path.as_str())
    }
}

/// A media row joined with the owner of its task.
#[derive(Debug, Clone, FromRow)]
pub struct MediaRecord {
    #[sqlx(flatten)]
    pub media: TaskMedia,
    pub owner_id: Uuid,
}

impl Owned for MediaRecord {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MediaResponse {
    pub id: Uuid,
    pub task_id: Uuid,
    pub filename: String,
    pub download_url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<TaskMedia> for MediaResponse {
    fn from(media: TaskMedia) -> Self {
        Self {
            id: media.id,
            task_id: media.task_id,
            filename: media.filename().to_string(),
            download_url: format!("/file/{}", media.id),
            uploaded_at: media.uploaded_at,
        }
    }
}

/// A file part received from a client, held in memory.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// What `MediaService::delete` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDeletion {
    Deleted,
    /// Requester does not own the task; nothing was touched.
    Ignored,
}
