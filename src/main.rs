mod auth;
mod authz;
mod db;
mod error;
mod media;
mod middleware;
mod routes;
mod state;
mod task;
mod user;

#[cfg(test)]
mod testing;

use anyhow::Context;
use db::{create_pool, run_migrations};
use media::{start_orphan_sweeper, MediaRepository, MediaService, MediaStorage};
use routes::create_router;
use state::{AppState, Config};
use std::{sync::Arc, time::Duration};
use task::{OrderingService, TaskRepository, TaskService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user::UserRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,task_board=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    tracing::info!("Connecting to database...");
    let db = create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("failed to connect to the database")?;

    tracing::info!("Running migrations...");
    run_migrations(&db).await.context("failed to run migrations")?;

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("failed to create media root {:?}", config.media_root))?;

    // Create repositories
    let user_repository = Arc::new(UserRepository::new(db.clone()));
    let task_repository = Arc::new(TaskRepository::new(db.clone()));
    let media_repository = Arc::new(MediaRepository::new(db.clone()));

    // Create services
    let media_service = MediaService::new(
        media_repository,
        MediaStorage::new(config.media_root.clone()),
    );
    let task_service = TaskService::new(task_repository.clone(), media_service.clone());
    let ordering_service = OrderingService::new(task_repository);
    let auth_service = auth::auth_service::AuthService::new(
        user_repository,
        config.jwt_secret.clone(),
        config.jwt_expiration_hours,
        bcrypt::DEFAULT_COST,
    );

    // Start orphaned-file sweeper
    let _sweeper = start_orphan_sweeper(
        media_service.clone(),
        &config.orphan_sweep_schedule,
        Duration::from_secs(config.orphan_grace_secs),
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to start orphan sweeper: {}", e))?;

    tracing::info!("Media files stored under {:?}", media_service.storage().root());

    // Create application state
    let state = AppState {
        config: config.clone(),
        auth_service,
        task_service,
        ordering_service,
        media_service,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = config.bind_addr();
    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
