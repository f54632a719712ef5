use std::sync::Arc;

use crate::auth::{create_access_token, hash_password, verify_password};
use crate::error::{AppError, Result};
use crate::user::{User, UserStore};

#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserStore>,
    jwt_secret: String,
    jwt_expiration_hours: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserStore>,
        jwt_secret: String,
        jwt_expiration_hours: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            user_repo,
            jwt_secret,
            jwt_expiration_hours,
            bcrypt_cost,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(User, String)> {
        if self.user_repo.find_by_username(username).await?.is_some() {
            return Err(AppError::Validation("A user with that username already exists".into()));
        }

        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|_| AppError::InternalError)??;

        let user = self
            .user_repo
            .create(username, &password_hash)
            .await
            .map_err(|e| match e {
                AppError::Database(sqlx::Error::Database(ref db_err))
                    if db_err.is_unique_violation() =>
                {
                    AppError::Validation("A user with that username already exists".into())
                }
                other => other,
            })?;

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = %user.id, "Registered user {}", user.username);

        Ok((user, token))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(User, String)> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".into()))?;

        let password = password.to_owned();
        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|_| AppError::InternalError)??;

        if !valid {
            return Err(AppError::Authentication("Invalid credentials".into()));
        }

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    fn issue_token(&self, user: &User) -> Result<String> {
        create_access_token(
            user.id,
            &user.username,
            &self.jwt_secret,
            self.jwt_expiration_hours,
        )
    }
}
