use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, REFERER},
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Redirect},
};
use uuid::Uuid;

use crate::{error::Result, middleware::AuthUser, state::AppState};

/// Delete an attached file, then send the client back where it came from
#[utoipa::path(
    post,
    path = "/delete-file/{id}",
    params(("id" = Uuid, Path, description = "Media id")),
    responses(
        (status = 303, description = "Redirect to the referring page; non-owners are redirected without any change"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found")
    ),
    tag = "media",
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(media_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Redirect> {
    state.media_service.delete(user_id, media_id).await?;

    let back = headers
        .get(REFERER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("/");

    Ok(Redirect::to(back))
}

/// Download an attached file
#[utoipa::path(
    get,
    path = "/file/{id}",
    params(("id" = Uuid, Path, description = "Media id")),
    responses(
        (status = 200, description = "File contents"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File not found")
    ),
    tag = "media",
    security(("bearer_auth" = []))
)]
pub async fn download_file(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(media_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (media, bytes) = state.media_service.open(user_id, media_id).await?;

    let mime = mime_guess::from_path(media.filename()).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.as_ref())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        media.filename()
    ))
    .unwrap_or(HeaderValue::from_static("attachment"));

    Ok((
        [(CONTENT_TYPE, content_type), (CONTENT_DISPOSITION, disposition)],
        bytes,
    ))
}
