use anyhow::Context;
use std::{path::PathBuf, sync::Arc};

use crate::{
    auth::auth_service::AuthService,
    media::media_service::MediaService,
    task::{ordering_service::OrderingService, task_service::TaskService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub task_service: TaskService,
    pub ordering_service: OrderingService,
    pub media_service: MediaService,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub media_root: PathBuf,
    pub upload_body_limit_bytes: usize,
    pub orphan_sweep_schedule: String,
    pub orphan_grace_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 3000)?,
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expiration_hours: parse_var("JWT_EXPIRATION_HOURS", 24)?,
            media_root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./media")),
            upload_body_limit_bytes: parse_var("UPLOAD_BODY_LIMIT_BYTES", 64 * 1024 * 1024)?,
            orphan_sweep_schedule: std::env::var("ORPHAN_SWEEP_SCHEDULE")
                .unwrap_or_else(|_| "0 0 * * * *".to_string()),
            orphan_grace_secs: parse_var("ORPHAN_GRACE_SECS", 3600)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_and_invalid() {
        assert_eq!(parse_var::<u16>("TASK_BOARD_TEST_UNSET_PORT", 3000).unwrap(), 3000);

        std::env::set_var("TASK_BOARD_TEST_BAD_NUMBER", "lots");
        let err = parse_var::<u64>("TASK_BOARD_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(err.to_string().contains("TASK_BOARD_TEST_BAD_NUMBER"));
    }
}
