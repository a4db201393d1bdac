use crate::db::map_write_error;
use crate::error::{AppError, AppResult};
use crate::models::{AuthUser, UserProfile};
use crate::service::users::UserDirectory;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

/// auth_users + profiles 两张表
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn insert_auth_user(&self, email: &str, password_hash: &str) -> AppResult<AuthUser> {
        sqlx::query_as::<_, AuthUser>(
            r#"
            INSERT INTO auth_users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, created_at
            "#
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::unique_violation(&e) {
            Some(_) => AppError::DuplicateEmail(email.to_string()),
            None => AppError::Database(e),
        })
    }

    async fn delete_auth_user(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM auth_users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_profile(&self, id: i64, profile: &UserProfile) -> AppResult<()> {
        sqlx::query("INSERT INTO profiles (id, data) VALUES ($1, $2)")
            .bind(id)
            .bind(Json(profile))
            .execute(&self.pool)
            .await
            .map_err(map_write_error::<UserProfile>)?;
        Ok(())
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE auth_users
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
