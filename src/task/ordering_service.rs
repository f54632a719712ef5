use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use super::task_models::OrderOutcome;
use super::task_repository::TaskStore;
use crate::error::{AppError, Result};

/// Persists the display order a user picks for their tasks.
#[derive(Clone)]
pub struct OrderingService {
    tasks: Arc<dyn TaskStore>,
}

impl OrderingService {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }

    /// Apply a comma-separated id list as the owner's new order.
    ///
    /// Either every listed task gets its index as position or nothing changes.
    pub async fn reorder(&self, user_id: Uuid, position: &str) -> Result<Vec<Uuid>> {
        let ordered = parse_positions(position)?;

        match self.tasks.apply_order(user_id, &ordered).await? {
            OrderOutcome::Applied => {
                tracing::debug!(%user_id, count = ordered.len(), "Reordered tasks");
                Ok(ordered)
            }
            OrderOutcome::Rejected { unowned } => {
                let ids: Vec<String> = unowned.iter().map(Uuid::to_string).collect();
                Err(AppError::Validation(format!(
                    "position: unknown task ids: {}",
                    ids.join(", ")
                )))
            }
        }
    }
}

pub fn parse_positions(raw: &str) -> Result<Vec<Uuid>> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();

    for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = Uuid::parse_str(segment).map_err(|_| {
            AppError::Validation(format!("position: {:?} is not a task id", segment))
        })?;

        if !seen.insert(id) {
            return Err(AppError::Validation(format!(
                "position: task {} is listed twice",
                id
            )));
        }
        ordered.push(id);
    }

    if ordered.is_empty() {
        return Err(AppError::Validation("position: This field is required.".into()));
    }

    Ok(ordered)
}
