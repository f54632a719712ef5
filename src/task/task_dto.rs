use axum::extract::Multipart;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::task_models::{NewTask, Task, TaskChanges};
use crate::error::{AppError, Result};
use crate::media::{MediaResponse, Upload};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    #[serde(rename = "search-area")]
    pub search_area: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    /// Incomplete tasks across the whole list, regardless of the search filter.
    pub count: i64,
    pub search_input: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskDetailResponse {
    pub task: Task,
    pub media: Vec<MediaResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PositionForm {
    /// Comma-separated task ids in their new display order.
    #[serde(default)]
    pub position: String,
}

/// Multipart body accepted by task create and update. Documentation only.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct TaskMultipartForm {
    pub title: Option<String>,
    pub description: Option<String>,
    /// true/false, on/off or 1/0
    pub complete: Option<String>,
    /// RFC 3339 or `YYYY-MM-DDTHH:MM`
    pub reminder_time: Option<String>,
    #[schema(value_type = Vec<String>, format = Binary)]
    pub files: Vec<String>,
}

/// Task fields read from a multipart body.
#[derive(Debug, Default, Validate)]
pub struct TaskForm {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub complete: Option<bool>,
    pub reminder_time: Option<DateTime<Utc>>,
}

impl TaskForm {
    /// Split a multipart body into task fields and the uploaded `files` parts.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<(Self, Vec<Upload>)> {
        let mut form = TaskForm::default();
        let mut uploads = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "files" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;

                // Browsers send an empty part when no file was picked.
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                uploads.push(Upload::new(filename, bytes));
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;

            match name.as_str() {
                "title" => form.title = Some(value.trim().to_string()),
                "description" => form.description = Some(value),
                "complete" => form.complete = Some(parse_checkbox(&value)?),
                "reminder_time" => form.reminder_time = parse_reminder_time(&value)?,
                other => tracing::debug!("Ignoring unknown form field {:?}", other),
            }
        }

        form.validate()?;
        Ok((form, uploads))
    }

    pub fn into_new_task(self) -> Result<NewTask> {
        let title = self
            .title
            .ok_or_else(|| AppError::Validation("title: This field is required.".into()))?;

        Ok(NewTask {
            title,
            description: self.description.filter(|d| !d.is_empty()),
            reminder_time: self.reminder_time,
        })
    }

    pub fn into_changes(self) -> TaskChanges {
        TaskChanges {
            title: self.title,
            description: self.description.filter(|d| !d.is_empty()),
            complete: self.complete,
            reminder_time: self.reminder_time,
        }
    }
}

fn parse_checkbox(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" | "" => Ok(false),
        other => Err(AppError::Validation(format!(
            "complete: {:?} is not a boolean",
            other
        ))),
    }
}

/// Accepts RFC 3339 or the `datetime-local` format browsers submit, read as UTC.
fn parse_reminder_time(value: &str) -> Result<Option<DateTime<Utc>>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Some(Utc.from_utc_datetime(&naive)))
        .ok_or_else(|| {
            AppError::Validation(format!("reminder_time: {:?} is not a valid date/time", value))
        })
}
