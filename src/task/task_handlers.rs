use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use uuid::Uuid;

use crate::{
    error::Result,
    media::{media_service::validate_uploads, MediaResponse},
    middleware::AuthUser,
    state::AppState,
};
use super::task_dto::{PositionForm, TaskDetailResponse, TaskForm, TaskListQuery, TaskListResponse};

/// List the authenticated user's tasks
#[utoipa::path(
    get,
    path = "/",
    params(
        ("search-area" = Option<String>, Query, description = "Case-insensitive title filter")
    ),
    responses(
        (status = 200, description = "List of tasks", body = TaskListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn get_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>> {
    let list = state
        .task_service
        .list_tasks(user_id, query.search_area.as_deref())
        .await?;

    Ok(Json(TaskListResponse {
        tasks: list.tasks,
        count: list.incomplete_count,
        search_input: list.search,
    }))
}

/// Get one task with its attached files
#[utoipa::path(
    get,
    path = "/task/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task detail", body = TaskDetailResponse),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskDetailResponse>> {
    let (task, media) = state.task_service.get_task_detail(user_id, task_id).await?;

    Ok(Json(TaskDetailResponse {
        task,
        media: media.into_iter().map(MediaResponse::from).collect(),
    }))
}

/// Create a task, optionally with files
#[utoipa::path(
    post,
    path = "/task-create",
    request_body(content = super::task_dto::TaskMultipartForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Task created", body = TaskDetailResponse),
        (status = 400, description = "Invalid field or rejected file")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let (form, uploads) = TaskForm::from_multipart(multipart).await?;
    validate_uploads(&uploads)?;
    let new_task = form.into_new_task()?;

    let task = state.task_service.create_task(user_id, new_task).await?;
    let media = state
        .media_service
        .attach_many(user_id, &task, &uploads)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TaskDetailResponse {
            task,
            media: media.into_iter().map(MediaResponse::from).collect(),
        }),
    ))
}

/// Update a task and attach any additional files
#[utoipa::path(
    post,
    path = "/task-update/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body(content = super::task_dto::TaskMultipartForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Task updated", body = TaskDetailResponse),
        (status = 400, description = "Invalid field or rejected file"),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<TaskDetailResponse>> {
    let (form, uploads) = TaskForm::from_multipart(multipart).await?;
    validate_uploads(&uploads)?;

    let task = state
        .task_service
        .update_task(user_id, task_id, form.into_changes())
        .await?;
    state
        .media_service
        .attach_many(user_id, &task, &uploads)
        .await?;

    let media = state.media_service.list_for_task(task.id).await?;

    Ok(Json(TaskDetailResponse {
        task,
        media: media.into_iter().map(MediaResponse::from).collect(),
    }))
}

/// Delete a completed task and its files
#[utoipa::path(
    post,
    path = "/task-delete/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task is not complete")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.task_service.delete_task(user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Save a new display order for the user's tasks
#[utoipa::path(
    post,
    path = "/task-reorder",
    request_body(content = PositionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 204, description = "Order saved"),
        (status = 400, description = "Malformed list or a task the user does not own")
    ),
    tag = "tasks",
    security(("bearer_auth" = []))
)]
pub async fn reorder_tasks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Form(form): Form<PositionForm>,
) -> Result<StatusCode> {
    state
        .ordering_service
        .reorder(user_id, &form.position)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
