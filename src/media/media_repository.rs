use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::media_models::{MediaRecord, TaskMedia};
use crate::error::Result;

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Insert a record, or return the existing one when the path is already taken.
    async fn upsert(&self, task_id: Uuid, file_path: &str) -> Result<TaskMedia>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaRecord>>;
    /// Oldest upload first.
    async fn find_by_task(&self, task_id: Uuid) -> Result<Vec<TaskMedia>>;
    async fn delete(&self, id: Uuid) -> Result<u64>;
    async fn all_file_paths(&self) -> Result<Vec<String>>;
}

#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for MediaRepository {
    async fn upsert(&self, task_id: Uuid, file_path: &str) -> Result<TaskMedia> {
        let media = sqlx::query_as::<_, TaskMedia>(
            "INSERT INTO task_media (task_id, file_path)
             VALUES ($1, $2)
             ON CONFLICT (file_path) DO UPDATE SET task_id = EXCLUDED.task_id
             RETURNING *",
        )
        .bind(task_id)
        .bind(file_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(media)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaRecord>> {
        let record = sqlx::query_as::<_, MediaRecord>(
            "SELECT m.id, m.task_id, m.file_path, m.uploaded_at, t.user_id AS owner_id
             FROM task_media m
             JOIN tasks t ON t.id = m.task_id
             WHERE m.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_task(&self, task_id: Uuid) -> Result<Vec<TaskMedia>> {
        let media = sqlx::query_as::<_, TaskMedia>(
            "SELECT * FROM task_media WHERE task_id = $1 ORDER BY uploaded_at ASC, id ASC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(media)
    }

    async fn delete(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM task_media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn all_file_paths(&self) -> Result<Vec<String>> {
        let paths = sqlx::query_scalar("SELECT file_path FROM task_media")
            .fetch_all(&self.pool)
            .await?;

        Ok(paths)
    }
}
