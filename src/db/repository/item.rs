use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateStockItem, StockItem, UpdateStockItem};
use crate::error::{AppError, AppResult};

// ============================================================================
// Item Repository
// ============================================================================

/// Every query is scoped by `user_id`, the partition key of the inventory.
pub struct ItemRepository;

impl ItemRepository {
    pub async fn list_by_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<StockItem>> {
        sqlx::query_as::<_, StockItem>(
            r#"
            SELECT
                id, user_id, name, target_quantity, current_quantity, unit,
                home_location, home_order, store_section, store_order,
                created_at, updated_at
            FROM stock_items
            WHERE user_id = ?
            ORDER BY home_order ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        id: &str,
        user_id: &str,
    ) -> AppResult<Option<StockItem>> {
        sqlx::query_as::<_, StockItem>(
            r#"
            SELECT
                id, user_id, name, target_quantity, current_quantity, unit,
                home_location, home_order, store_section, store_order,
                created_at, updated_at
            FROM stock_items
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// New items go after the last one in both home and store order.
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        input: &CreateStockItem,
    ) -> AppResult<StockItem> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query_as::<_, StockItem>(
            r#"
            INSERT INTO stock_items (
                id, user_id, name, target_quantity, current_quantity, unit,
                home_location, home_order, store_section, store_order,
                created_at, updated_at
            )
            VALUES (
                ?, ?, ?, ?, ?, ?, ?,
                (SELECT COALESCE(MAX(home_order), -1) + 1 FROM stock_items WHERE user_id = ?),
                ?,
                (SELECT COALESCE(MAX(store_order), -1) + 1 FROM stock_items WHERE user_id = ?),
                ?, ?
            )
            RETURNING
                id, user_id, name, target_quantity, current_quantity, unit,
                home_location, home_order, store_section, store_order,
                created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&input.name)
        .bind(input.target_quantity)
        .bind(input.current_quantity.unwrap_or(0.0))
        .bind(&input.unit)
        .bind(input.home_location.as_deref().unwrap_or(""))
        .bind(user_id)
        .bind(input.store_section.as_deref().unwrap_or(""))
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        user_id: &str,
        update: &UpdateStockItem,
    ) -> AppResult<Option<StockItem>> {
        let now = Utc::now();

        sqlx::query_as::<_, StockItem>(
            r#"
            UPDATE stock_items
            SET name = COALESCE(?, name),
                target_quantity = COALESCE(?, target_quantity),
                current_quantity = COALESCE(?, current_quantity),
                unit = COALESCE(?, unit),
                home_location = COALESCE(?, home_location),
                home_order = COALESCE(?, home_order),
                store_section = COALESCE(?, store_section),
                store_order = COALESCE(?, store_order),
                updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING
                id, user_id, name, target_quantity, current_quantity, unit,
                home_location, home_order, store_section, store_order,
                created_at, updated_at
            "#,
        )
        .bind(update.name.as_deref())
        .bind(update.target_quantity)
        .bind(update.current_quantity)
        .bind(update.unit.as_deref())
        .bind(update.home_location.as_deref())
        .bind(update.home_order)
        .bind(update.store_section.as_deref())
        .bind(update.store_order)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Returns `false` when no item with this id exists in the partition.
    pub async fn delete(pool: &SqlitePool, id: &str, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM stock_items WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::init::memory_pool;

    fn milk() -> CreateStockItem {
        CreateStockItem {
            name: "Milk".to_string(),
            target_quantity: 2.0,
            current_quantity: None,
            unit: "l".to_string(),
            home_location: Some("Fridge".to_string()),
            store_section: None,
        }
    }

    #[tokio::test]
    async fn items_are_partitioned_by_user() {
        let pool = memory_pool().await;

        let item = ItemRepository::create(&pool, "user-a", &milk()).await.unwrap();
        assert_eq!(item.current_quantity, 0.0);
        assert_eq!(item.home_order, 0);

        assert_eq!(ItemRepository::list_by_user(&pool, "user-a").await.unwrap().len(), 1);
        assert!(ItemRepository::list_by_user(&pool, "user-b").await.unwrap().is_empty());
        assert!(ItemRepository::find_by_id(&pool, &item.id, "user-b")
            .await
            .unwrap()
            .is_none());
        assert!(!ItemRepository::delete(&pool, &item.id, "user-b").await.unwrap());
        assert!(ItemRepository::delete(&pool, &item.id, "user-a").await.unwrap());
    }

    #[tokio::test]
    async fn orders_are_appended_and_updates_are_partial() {
        let pool = memory_pool().await;

        ItemRepository::create(&pool, "user-a", &milk()).await.unwrap();
        let second = ItemRepository::create(&pool, "user-a", &milk()).await.unwrap();
        assert_eq!(second.home_order, 1);
        assert_eq!(second.store_order, 1);

        let updated = ItemRepository::update(
            &pool,
            &second.id,
            "user-a",
            &UpdateStockItem {
                current_quantity: Some(1.5),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.current_quantity, 1.5);
        assert_eq!(updated.name, "Milk");
        assert_eq!(updated.home_location, "Fridge");

        let missing = ItemRepository::update(&pool, &second.id, "user-b", &UpdateStockItem::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
