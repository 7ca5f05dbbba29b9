use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::models::{AccountShare, NewAccountShare, ShareStatus, UpdateAccountShare};
use crate::error::{AppError, AppResult};
use crate::services::account_share::ShareStore;

// ============================================================================
// Account Share Repository
// ============================================================================

const SHARE_COLUMNS: &str = r#"
    id, owner_user_id, owner_auth_user_id, owner_email, target_email, status,
    target_auth_user_id, target_user_id,
    created_at, updated_at, responded_at, stopped_at
"#;

fn share_from_row(r: &SqliteRow) -> AppResult<AccountShare> {
    let status: String = r.get("status");
    let status = ShareStatus::try_from(status.as_str())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    Ok(AccountShare {
        id: r.get("id"),
        owner_user_id: r.get("owner_user_id"),
        owner_auth_user_id: r.get("owner_auth_user_id"),
        owner_email: r.get("owner_email"),
        target_email: r.get("target_email"),
        status,
        target_auth_user_id: r.get("target_auth_user_id"),
        target_user_id: r.get("target_user_id"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        responded_at: r.get("responded_at"),
        stopped_at: r.get("stopped_at"),
    })
}

pub struct AccountShareRepository;

impl AccountShareRepository {
    pub async fn list_all(pool: &SqlitePool) -> AppResult<Vec<AccountShare>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM account_shares ORDER BY created_at ASC",
            SHARE_COLUMNS
        ))
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        rows.iter().map(share_from_row).collect()
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<AccountShare>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM account_shares WHERE id = ?",
            SHARE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        row.as_ref().map(share_from_row).transpose()
    }

    /// Insert a new `pending` share.
    ///
    /// The partial unique index on active shares rejects a second active
    /// share for the same owner with `AppError::Conflict`.
    pub async fn create(pool: &SqlitePool, input: &NewAccountShare) -> AppResult<AccountShare> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO account_shares (
                id, owner_user_id, owner_auth_user_id, owner_email, target_email,
                status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            SHARE_COLUMNS
        ))
        .bind(&id)
        .bind(&input.owner_user_id)
        .bind(&input.owner_auth_user_id)
        .bind(&input.owner_email)
        .bind(&input.target_email)
        .bind(ShareStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                "An active share already exists for this account".to_string(),
            ),
            other => AppError::Database(other),
        })?;

        share_from_row(&row)
    }

    /// Apply a partial update. Absent fields keep their stored value.
    ///
    /// Fails with `NotFound` for an unknown id and with `Conflict` when
    /// `expected_status` no longer matches the stored status.
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        update: &UpdateAccountShare,
    ) -> AppResult<AccountShare> {
        if update.is_empty() {
            return Self::find_by_id(pool, id)
                .await?
                .ok_or_else(|| AppError::NotFound("Share not found".to_string()));
        }

        let expected = update.expected_status.map(ShareStatus::as_str);

        let row = sqlx::query(&format!(
            r#"
            UPDATE account_shares
            SET status = COALESCE(?, status),
                target_auth_user_id = COALESCE(?, target_auth_user_id),
                target_user_id = COALESCE(?, target_user_id),
                updated_at = COALESCE(?, updated_at),
                responded_at = COALESCE(?, responded_at),
                stopped_at = COALESCE(?, stopped_at)
            WHERE id = ? AND (? IS NULL OR status = ?)
            RETURNING {}
            "#,
            SHARE_COLUMNS
        ))
        .bind(update.status.map(ShareStatus::as_str))
        .bind(update.target_auth_user_id.as_deref())
        .bind(update.target_user_id.as_deref())
        .bind(update.updated_at)
        .bind(update.responded_at)
        .bind(update.stopped_at)
        .bind(id)
        .bind(expected)
        .bind(expected)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        match row {
            Some(r) => share_from_row(&r),
            None => match Self::find_by_id(pool, id).await? {
                None => Err(AppError::NotFound("Share not found".to_string())),
                Some(current) => Err(AppError::Conflict(format!(
                    "Share {} is {} and was not updated",
                    current.id, current.status
                ))),
            },
        }
    }
}

#[async_trait]
impl ShareStore for SqlitePool {
    async fn list_all(&self) -> AppResult<Vec<AccountShare>> {
        AccountShareRepository::list_all(self).await
    }

    async fn create(&self, input: NewAccountShare) -> AppResult<AccountShare> {
        AccountShareRepository::create(self, &input).await
    }

    async fn update(&self, id: &str, update: UpdateAccountShare) -> AppResult<AccountShare> {
        AccountShareRepository::update(self, id, &update).await
    }

    async fn get_by_id(&self, id: &str) -> AppResult<Option<AccountShare>> {
        AccountShareRepository::find_by_id(self, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::init::memory_pool;

    fn new_share(owner: &str, target: &str) -> NewAccountShare {
        NewAccountShare {
            owner_user_id: owner.to_string(),
            owner_auth_user_id: format!("auth-{}", owner),
            owner_email: format!("{}@example.test", owner),
            target_email: target.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let pool = memory_pool().await;

        let created = AccountShareRepository::create(&pool, &new_share("owner-1", "t@x.test"))
            .await
            .unwrap();
        assert_eq!(created.status, ShareStatus::Pending);
        assert_eq!(created.created_at, created.updated_at);
        assert!(created.target_auth_user_id.is_none());

        let fetched = AccountShareRepository::find_by_id(&pool, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, created);

        let all = AccountShareRepository::list_all(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn second_active_share_for_owner_is_rejected_by_index() {
        let pool = memory_pool().await;

        AccountShareRepository::create(&pool, &new_share("owner-1", "a@x.test"))
            .await
            .unwrap();
        let err = AccountShareRepository::create(&pool, &new_share("owner-1", "b@x.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

        // Other owners are unaffected.
        AccountShareRepository::create(&pool, &new_share("owner-2", "a@x.test"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn terminal_share_frees_the_owner_slot() {
        let pool = memory_pool().await;

        let first = AccountShareRepository::create(&pool, &new_share("owner-1", "a@x.test"))
            .await
            .unwrap();
        AccountShareRepository::update(
            &pool,
            &first.id,
            &UpdateAccountShare {
                status: Some(ShareStatus::Cancelled),
                updated_at: Some(Utc::now()),
                expected_status: Some(ShareStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        AccountShareRepository::create(&pool, &new_share("owner-1", "b@x.test"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_merges_fields_and_checks_precondition() {
        let pool = memory_pool().await;
        let share = AccountShareRepository::create(&pool, &new_share("owner-1", "t@x.test"))
            .await
            .unwrap();

        let at = Utc::now();
        let accepted = AccountShareRepository::update(
            &pool,
            &share.id,
            &UpdateAccountShare {
                status: Some(ShareStatus::Accepted),
                target_auth_user_id: Some("auth-target".to_string()),
                target_user_id: Some("target".to_string()),
                updated_at: Some(at),
                responded_at: Some(at),
                expected_status: Some(ShareStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(accepted.status, ShareStatus::Accepted);
        assert_eq!(accepted.target_auth_user_id.as_deref(), Some("auth-target"));
        assert_eq!(accepted.owner_email, share.owner_email);
        assert_eq!(accepted.stopped_at, None);

        // A second writer still expecting `pending` loses.
        let err = AccountShareRepository::update(
            &pool,
            &share.id,
            &UpdateAccountShare {
                status: Some(ShareStatus::Cancelled),
                expected_status: Some(ShareStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let pool = memory_pool().await;

        let err = AccountShareRepository::update(
            &pool,
            "missing",
            &UpdateAccountShare {
                status: Some(ShareStatus::Stopped),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = AccountShareRepository::update(&pool, "missing", &UpdateAccountShare::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
