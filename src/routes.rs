use crate::{
    auth::{self, auth_dto::*},
    media::{self, MediaResponse, TaskMedia},
    middleware::auth_middleware,
    state::AppState,
    task::{self, task_dto::*, Task},
    user::UserResponse,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::auth_handlers::register,
        auth::auth_handlers::login,
        task::task_handlers::get_tasks,
        task::task_handlers::get_task,
        task::task_handlers::create_task,
        task::task_handlers::update_task,
        task::task_handlers::delete_task,
        task::task_handlers::reorder_tasks,
        media::media_handlers::delete_file,
        media::media_handlers::download_file,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            Task,
            TaskMedia,
            MediaResponse,
            TaskListResponse,
            TaskDetailResponse,
            TaskMultipartForm,
            PositionForm,
        )
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "tasks", description = "Task management endpoints"),
        (name = "media", description = "Files attached to tasks")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    // Protected routes (auth required)
    let task_routes = Router::new()
        .route("/", get(task::get_tasks))
        .route("/task/:id", get(task::get_task))
        .route("/task-create", post(task::create_task))
        .route("/task-update/:id", post(task::update_task))
        .route("/task-delete/:id", post(task::delete_task))
        .route("/task-reorder", post(task::reorder_tasks))
        .route("/delete-file/:id", post(media::delete_file))
        .route("/file/:id", get(media::download_file))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(auth_routes)
        .merge(task_routes)
        .layer(DefaultBodyLimit::max(state.config.upload_body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
