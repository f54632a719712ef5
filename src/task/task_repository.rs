use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::task_models::{DeleteOutcome, NewTask, OrderOutcome, Task, TaskChanges};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>>;
    /// Owner's tasks by position (unpositioned last), then creation time.
    async fn find_all(&self, user_id: Uuid, filters: &TaskFilters) -> Result<Vec<Task>>;
    async fn count_incomplete(&self, user_id: Uuid) -> Result<i64>;
    async fn create(&self, user_id: Uuid, task: &NewTask) -> Result<Task>;
    async fn update(&self, id: Uuid, changes: &TaskChanges) -> Result<Option<Task>>;
    /// Delete the task and its media rows, only if it is complete. One transaction.
    async fn delete_complete(&self, id: Uuid) -> Result<DeleteOutcome>;
    /// Set `position = index` for every listed task, or nothing at all.
    async fn apply_order(&self, user_id: Uuid, ordered: &[Uuid]) -> Result<OrderOutcome>;
}

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl TaskStore for TaskRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn find_all(&self, user_id: Uuid, filters: &TaskFilters) -> Result<Vec<Task>> {
        let mut query = "SELECT * FROM tasks WHERE user_id = $1".to_string();

        if filters.search.is_some() {
            query.push_str(" AND title ILIKE $2");
        }

        query.push_str(" ORDER BY position ASC NULLS LAST, created_at ASC");

        let mut db_query = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(search) = &filters.search {
            db_query = db_query.bind(like_pattern(search));
        }

        let tasks = db_query.fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn count_incomplete(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE user_id = $1 AND complete = FALSE")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn create(&self, user_id: Uuid, task: &NewTask) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (user_id, title, description, reminder_time)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(user_id)
        .bind(&task.title)
        .bind(task.description.as_deref())
        .bind(task.reminder_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update(&self, id: Uuid, changes: &TaskChanges) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                complete = COALESCE($3, complete),
                reminder_time = COALESCE($4, reminder_time)
             WHERE id = $5
             RETURNING *",
        )
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.complete)
        .bind(changes.reminder_time)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn delete_complete(&self, id: Uuid) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        let complete: Option<bool> =
            sqlx::query_scalar("SELECT complete FROM tasks WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        match complete {
            None => return Ok(DeleteOutcome::Missing),
            Some(false) => return Ok(DeleteOutcome::Incomplete),
            Some(true) => {}
        }

        sqlx::query("DELETE FROM task_media WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn apply_order(&self, user_id: Uuid, ordered: &[Uuid]) -> Result<OrderOutcome> {
        let mut tx = self.pool.begin().await?;

        let owned: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM tasks WHERE user_id = $1 AND id = ANY($2) FOR UPDATE",
        )
        .bind(user_id)
        .bind(ordered)
        .fetch_all(&mut *tx)
        .await?;

        let unowned: Vec<Uuid> = ordered
            .iter()
            .filter(|id| !owned.contains(id))
            .copied()
            .collect();

        if !unowned.is_empty() {
            tx.rollback().await?;
            return Ok(OrderOutcome::Rejected { unowned });
        }

        sqlx::query(
            "UPDATE tasks SET position = (ord.idx - 1)::int
             FROM unnest($2::uuid[]) WITH ORDINALITY AS ord(id, idx)
             WHERE tasks.id = ord.id AND tasks.user_id = $1",
        )
        .bind(user_id)
        .bind(ordered)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(OrderOutcome::Applied)
    }
}
