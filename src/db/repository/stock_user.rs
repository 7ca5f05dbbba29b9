use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::StockUser;
use crate::error::{AppError, AppResult};

// ============================================================================
// Stock User Repository
// ============================================================================

pub struct StockUserRepository;

impl StockUserRepository {
    /// Find the local user for an auth identity. With duplicates, the most
    /// recently created row wins.
    pub async fn find_by_auth_id(
        pool: &SqlitePool,
        auth_user_id: &str,
    ) -> AppResult<Option<StockUser>> {
        sqlx::query_as::<_, StockUser>(
            r#"
            SELECT id, auth_user_id, email, created_at, updated_at
            FROM stock_users
            WHERE auth_user_id = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(auth_user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn create(pool: &SqlitePool, auth_user_id: &str, email: &str) -> AppResult<StockUser> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query_as::<_, StockUser>(
            r#"
            INSERT INTO stock_users (id, auth_user_id, email, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(auth_user_id) DO UPDATE SET auth_user_id = excluded.auth_user_id
            RETURNING id, auth_user_id, email, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(auth_user_id)
        .bind(email)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn set_email(pool: &SqlitePool, id: &str, email: &str) -> AppResult<StockUser> {
        let now = Utc::now();

        sqlx::query_as::<_, StockUser>(
            r#"
            UPDATE stock_users
            SET email = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, auth_user_id, email, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Return the local user for `auth_user_id`, creating it on first sight and
    /// refreshing the stored email when the auth service reports a new one.
    pub async fn get_or_create(
        pool: &SqlitePool,
        auth_user_id: &str,
        email: &str,
    ) -> AppResult<StockUser> {
        match Self::find_by_auth_id(pool, auth_user_id).await? {
            Some(user) if user.email == email => Ok(user),
            Some(user) => {
                tracing::debug!("Updating stored email for stock user {}", user.id);
                Self::set_email(pool, &user.id, email).await
            }
            None => {
                let user = Self::create(pool, auth_user_id, email).await?;
                tracing::info!(
                    "Created stock user {} for auth user {}",
                    user.id,
                    auth_user_id
                );
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::init::memory_pool;

    #[tokio::test]
    async fn get_or_create_is_stable_per_auth_id() {
        let pool = memory_pool().await;

        let first = StockUserRepository::get_or_create(&pool, "auth-1", "a@x.test")
            .await
            .unwrap();
        let second = StockUserRepository::get_or_create(&pool, "auth-1", "a@x.test")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let other = StockUserRepository::get_or_create(&pool, "auth-2", "b@x.test")
            .await
            .unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn get_or_create_refreshes_changed_email() {
        let pool = memory_pool().await;

        let first = StockUserRepository::get_or_create(&pool, "auth-1", "old@x.test")
            .await
            .unwrap();
        let updated = StockUserRepository::get_or_create(&pool, "auth-1", "new@x.test")
            .await
            .unwrap();

        assert_eq!(updated.id, first.id);
        assert_eq!(updated.email, "new@x.test");
        assert!(updated.updated_at >= first.updated_at);
    }
}
