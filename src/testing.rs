//! In-memory store used by unit tests in place of Postgres.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use axum::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::media::{media_models::MediaRecord, media_repository::MediaStore, TaskMedia};
use crate::task::{
    task_models::{DeleteOutcome, NewTask, OrderOutcome, TaskChanges},
    task_repository::{TaskFilters, TaskStore},
    Task,
};
use crate::user::{User, UserStore};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
    media: Vec<TaskMedia>,
}

/// All tables sit behind one lock, so multi-row operations are atomic
/// the same way a transaction is.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_media_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// Make every media insert fail with a database error.
    pub fn fail_media_writes(&self, fail: bool) {
        self.fail_media_writes.store(fail, Ordering::SeqCst);
    }

    pub fn position_of(&self, task_id: Uuid) -> Option<i32> {
        self.lock()
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .and_then(|t| t.position)
    }

    pub fn media_count(&self) -> usize {
        self.lock().media.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        self.lock().users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.lock().tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn find_all(&self, user_id: Uuid, filters: &TaskFilters) -> Result<Vec<Task>> {
        let needle = filters.search.as_deref().map(str::to_lowercase);
        let mut tasks: Vec<Task> = self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .filter(|t| match &needle {
                Some(n) => t.title.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .cloned()
            .collect();

        tasks.sort_by_key(|t| (t.position.is_none(), t.position, t.created_at));
        Ok(tasks)
    }

    async fn count_incomplete(&self, user_id: Uuid) -> Result<i64> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && !t.complete)
            .count() as i64)
    }

    async fn create(&self, user_id: Uuid, task: &NewTask) -> Result<Task> {
        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            title: task.title.clone(),
            description: task.description.clone(),
            complete: false,
            position: None,
            reminder_time: task.reminder_time,
            created_at: Utc::now(),
        };
        self.lock().tasks.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: Uuid, changes: &TaskChanges) -> Result<Option<Task>> {
        let mut tables = self.lock();
        let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        if let Some(title) = &changes.title {
            task.title = title.clone();
        }
        if let Some(description) = &changes.description {
            task.description = Some(description.clone());
        }
        if let Some(complete) = changes.complete {
            task.complete = complete;
        }
        if let Some(reminder_time) = changes.reminder_time {
            task.reminder_time = Some(reminder_time);
        }

        Ok(Some(task.clone()))
    }

    async fn delete_complete(&self, id: Uuid) -> Result<DeleteOutcome> {
        let mut tables = self.lock();
        match tables.tasks.iter().find(|t| t.id == id) {
            None => return Ok(DeleteOutcome::Missing),
            Some(t) if !t.complete => return Ok(DeleteOutcome::Incomplete),
            Some(_) => {}
        }

        tables.media.retain(|m| m.task_id != id);
        tables.tasks.retain(|t| t.id != id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn apply_order(&self, user_id: Uuid, ordered: &[Uuid]) -> Result<OrderOutcome> {
        let mut tables = self.lock();

        let unowned: Vec<Uuid> = ordered
            .iter()
            .filter(|id| {
                !tables
                    .tasks
                    .iter()
                    .any(|t| t.id == **id && t.user_id == user_id)
            })
            .copied()
            .collect();

        if !unowned.is_empty() {
            return Ok(OrderOutcome::Rejected { unowned });
        }

        for (index, id) in ordered.iter().enumerate() {
            if let Some(task) = tables.tasks.iter_mut().find(|t| t.id == *id) {
                task.position = Some(index as i32);
            }
        }

        Ok(OrderOutcome::Applied)
    }
}

#[async_trait]
impl MediaStore for MemoryStore {
    async fn upsert(&self, task_id: Uuid, file_path: &str) -> Result<TaskMedia> {
        if self.fail_media_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut tables = self.lock();
        if let Some(existing) = tables.media.iter().find(|m| m.file_path == file_path) {
            return Ok(existing.clone());
        }

        let media = TaskMedia {
            id: Uuid::new_v4(),
            task_id,
            file_path: file_path.to_string(),
            uploaded_at: Utc::now(),
        };
        tables.media.push(media.clone());
        Ok(media)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaRecord>> {
        let tables = self.lock();
        let record = tables.media.iter().find(|m| m.id == id).and_then(|m| {
            tables
                .tasks
                .iter()
                .find(|t| t.id == m.task_id)
                .map(|t| MediaRecord {
                    media: m.clone(),
                    owner_id: t.user_id,
                })
        });
        Ok(record)
    }

    async fn find_by_task(&self, task_id: Uuid) -> Result<Vec<TaskMedia>> {
        let mut media: Vec<TaskMedia> = self
            .lock()
            .media
            .iter()
            .filter(|m| m.task_id == task_id)
            .cloned()
            .collect();
        media.sort_by_key(|m| m.uploaded_at);
        Ok(media)
    }

    async fn delete(&self, id: Uuid) -> Result<u64> {
        let mut tables = self.lock();
        let before = tables.media.len();
        tables.media.retain(|m| m.id != id);
        Ok((before - tables.media.len()) as u64)
    }

    async fn all_file_paths(&self) -> Result<Vec<String>> {
        Ok(self.lock().media.iter().map(|m| m.file_path.clone()).collect())
    }
}
