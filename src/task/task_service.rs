use std::sync::Arc;

use uuid::Uuid;

use super::task_models::{DeleteOutcome, NewTask, Task, TaskChanges};
use super::task_repository::{TaskFilters, TaskStore};
use crate::authz::authorize;
use crate::error::{AppError, Result};
use crate::media::{media_models::TaskMedia, media_service::MediaService};

pub const INCOMPLETE_DELETE_MESSAGE: &str = "Cannot delete an incomplete task.";

#[derive(Debug)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub incomplete_count: i64,
    pub search: String,
}

/// Service layer for task‑related business logic.
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskStore>,
    media: MediaService,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskStore>, media: MediaService) -> Self {
        Self { repo, media }
    }

    pub async fn list_tasks(&self, user_id: Uuid, search: Option<&str>) -> Result<TaskList> {
        let search = search.map(str::trim).unwrap_or_default().to_string();
        let filters = TaskFilters {
            search: (!search.is_empty()).then(|| search.clone()),
        };

        let tasks = self.repo.find_all(user_id, &filters).await?;
        let incomplete_count = self.repo.count_incomplete(user_id).await?;

        Ok(TaskList {
            tasks,
            incomplete_count,
            search,
        })
    }

    /// Fetch a task the requester owns.
    pub async fn get_task(&self, user_id: Uuid, task_id: Uuid) -> Result<Task> {
        let task = self
            .repo
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

        authorize(user_id, &task).require("task")?;
        Ok(task)
    }

    pub async fn get_task_detail(
        &self,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<(Task, Vec<TaskMedia>)> {
        let task = self.get_task(user_id, task_id).await?;
        let media = self.media.list_for_task(task.id).await?;
        Ok((task, media))
    }

    pub async fn create_task(&self, user_id: Uuid, task: NewTask) -> Result<Task> {
        let task = self.repo.create(user_id, &task).await?;
        tracing::info!(%user_id, task_id = %task.id, "Created task");
        Ok(task)
    }

    pub async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Task> {
        self.get_task(user_id, task_id).await?;

        self.repo
            .update(task_id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))
    }

    /// Delete a completed task together with its media records and files.
    pub async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<()> {
        let task = self.get_task(user_id, task_id).await?;
        if !task.complete {
            return Err(AppError::PolicyViolation(INCOMPLETE_DELETE_MESSAGE.into()));
        }

        let media = self.media.list_for_task(task.id).await?;

        match self.repo.delete_complete(task.id).await? {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::Incomplete => {
                return Err(AppError::PolicyViolation(INCOMPLETE_DELETE_MESSAGE.into()))
            }
            DeleteOutcome::Missing => return Err(AppError::NotFound("Task not found".into())),
        }

        self.media.remove_stored_files(&media).await;
        tracing::info!(%user_id, %task_id, files = media.len(), "Deleted task");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{media_models::Upload, media_storage::MediaStorage};
    use crate::task::OrderingService;
    use crate::testing::MemoryStore;
    use tempfile::TempDir;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: TaskService,
        media: MediaService,
        dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let media = MediaService::new(store.clone(), MediaStorage::new(dir.path()));
        let service = TaskService::new(store.clone(), media.clone());
        Fixture {
            store,
            service,
            media,
            dir,
        }
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            description: Some("details".into()),
            reminder_time: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults() {
        let fx = fixture();
        let owner = Uuid::new_v4();
        let task = fx.service.create_task(owner, new_task("Buy milk")).await.unwrap();

        assert_eq!(task.user_id, owner);
        assert!(!task.complete);
        assert_eq!(task.position, None);
        assert_eq!(task.description.as_deref(), Some("details"));
    }

    #[tokio::test]
    async fn test_incomplete_task_cannot_be_deleted() {
        let fx = fixture();
        let owner = Uuid::new_v4();
        let task = fx.service.create_task(owner, new_task("Buy milk")).await.unwrap();

        match fx.service.delete_task(owner, task.id).await {
            Err(AppError::PolicyViolation(msg)) => assert_eq!(msg, INCOMPLETE_DELETE_MESSAGE),
            other => panic!("expected PolicyViolation, got {:?}", other),
        }
        assert!(fx.service.get_task(owner, task.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_complete_task_delete_cascades_media_and_files() {
        let fx = fixture();
        let owner = Uuid::new_v4();
        let task = fx.service.create_task(owner, new_task("Taxes")).await.unwrap();
        let uploads = vec![
            Upload::new("receipt.pdf", b"%PDF".to_vec()),
            Upload::new("notes.txt", b"remember".to_vec()),
        ];
        let media = fx.media.attach_many(owner, &task, &uploads).await.unwrap();
        assert_eq!(media.len(), 2);

        let changes = TaskChanges {
            complete: Some(true),
            ..Default::default()
        };
        fx.service.update_task(owner, task.id, changes).await.unwrap();
        fx.service.delete_task(owner, task.id).await.unwrap();

        assert!(matches!(
            fx.service.get_task(owner, task.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(fx.store.media_count(), 0);
        for m in &media {
            assert!(!fx.dir.path().join(&m.file_path).exists());
        }
    }

    #[tokio::test]
    async fn test_other_users_cannot_touch_task() {
        let fx = fixture();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let task = fx.service.create_task(owner, new_task("Private")).await.unwrap();

        assert!(matches!(
            fx.service.get_task(stranger, task.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            fx.service
                .update_task(stranger, task.id, TaskChanges::default())
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            fx.service.delete_task(stranger, task.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            fx.service.get_task(owner, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let fx = fixture();
        let owner = Uuid::new_v4();
        let task = fx.service.create_task(owner, new_task("Draft")).await.unwrap();

        let changes = TaskChanges {
            title: Some("Final".into()),
            ..Default::default()
        };
        let updated = fx.service.update_task(owner, task.id, changes).await.unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.description.as_deref(), Some("details"));
        assert!(!updated.complete);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_list_search_and_incomplete_count() {
        let fx = fixture();
        let owner = Uuid::new_v4();
        fx.service.create_task(owner, new_task("Buy MILK")).await.unwrap();
        let bread = fx.service.create_task(owner, new_task("Buy bread")).await.unwrap();
        fx.service.create_task(owner, new_task("Call mum")).await.unwrap();
        fx.service.create_task(Uuid::new_v4(), new_task("milk for someone else")).await.unwrap();

        let done = TaskChanges {
            complete: Some(true),
            ..Default::default()
        };
        fx.service.update_task(owner, bread.id, done).await.unwrap();

        let all = fx.service.list_tasks(owner, None).await.unwrap();
        assert_eq!(all.tasks.len(), 3);
        assert_eq!(all.incomplete_count, 2);

        let milk = fx.service.list_tasks(owner, Some(" milk ")).await.unwrap();
        assert_eq!(milk.tasks.len(), 1);
        assert_eq!(milk.tasks[0].title, "Buy MILK");
        assert_eq!(milk.incomplete_count, 2);
        assert_eq!(milk.search, "milk");

        let blank = fx.service.list_tasks(owner, Some("   ")).await.unwrap();
        assert_eq!(blank.tasks.len(), 3);
    }

    #[tokio::test]
    async fn test_list_orders_by_position_then_creation() {
        let fx = fixture();
        let owner = Uuid::new_v4();
        let mut ids = Vec::new();
        for title in ["first", "second", "third", "fourth"] {
            let task = fx.service.create_task(owner, new_task(title)).await.unwrap();
            ids.push(task.id);
        }

        let titles = |list: TaskList| -> Vec<String> {
            list.tasks.into_iter().map(|t| t.title).collect()
        };

        let fresh = fx.service.list_tasks(owner, None).await.unwrap();
        assert_eq!(titles(fresh), vec!["first", "second", "third", "fourth"]);

        OrderingService::new(fx.store.clone())
            .reorder(owner, &format!("{},{}", ids[2], ids[0]))
            .await
            .unwrap();

        let ordered = fx.service.list_tasks(owner, None).await.unwrap();
        assert_eq!(titles(ordered), vec!["third", "first", "second", "fourth"]);

        let searched = fx.service.list_tasks(owner, Some("ir")).await.unwrap();
        assert_eq!(titles(searched), vec!["third", "first"]);
    }
}
