use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::Owned;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub complete: bool,
    /// Display rank set by the last reorder; `None` until the task is listed in one.
    pub position: Option<i32>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Owned for Task {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub reminder_time: Option<DateTime<Utc>>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub complete: Option<bool>,
    pub reminder_time: Option<DateTime<Utc>>,
}

/// Result of applying an ordering inside the store's transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    Applied,
    /// Nothing was written; these ids are missing or belong to someone else.
    Rejected { unowned: Vec<Uuid> },
}

/// Result of a guarded delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Incomplete,
    Missing,
}
