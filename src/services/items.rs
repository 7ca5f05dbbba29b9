use sqlx::SqlitePool;

use crate::db::{CreateStockItem, ItemRepository, StockItem, UpdateStockItem};
use crate::error::{AppError, AppResult};

/// Item operations. `user_id` is always the effective owner id, never the
/// raw actor id.
pub struct ItemService;

impl ItemService {
    fn validate_text(value: &str, field: &str) -> AppResult<()> {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{} is required", field)));
        }
        Ok(())
    }

    fn validate_quantity(value: f64, field: &str) -> AppResult<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::BadRequest(format!(
                "{} must be a non-negative number",
                field
            )));
        }
        Ok(())
    }

    pub fn validate_create(input: &CreateStockItem) -> AppResult<()> {
        Self::validate_text(&input.name, "name")?;
        Self::validate_text(&input.unit, "unit")?;
        Self::validate_quantity(input.target_quantity, "targetQuantity")?;
        if let Some(current) = input.current_quantity {
            Self::validate_quantity(current, "currentQuantity")?;
        }
        Ok(())
    }

    pub fn validate_update(update: &UpdateStockItem) -> AppResult<()> {
        if let Some(ref name) = update.name {
            Self::validate_text(name, "name")?;
        }
        if let Some(ref unit) = update.unit {
            Self::validate_text(unit, "unit")?;
        }
        if let Some(target) = update.target_quantity {
            Self::validate_quantity(target, "targetQuantity")?;
        }
        if let Some(current) = update.current_quantity {
            Self::validate_quantity(current, "currentQuantity")?;
        }
        Ok(())
    }

    pub async fn list(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<StockItem>> {
        ItemRepository::list_by_user(pool, user_id).await
    }

    pub async fn get(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<StockItem> {
        ItemRepository::find_by_id(pool, id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        mut input: CreateStockItem,
    ) -> AppResult<StockItem> {
        Self::validate_create(&input)?;
        input.name = input.name.trim().to_string();
        input.unit = input.unit.trim().to_string();

        let item = ItemRepository::create(pool, user_id, &input).await?;
        tracing::debug!("Created item {} for user {}", item.id, user_id);
        Ok(item)
    }

    pub async fn update(
        pool: &SqlitePool,
        user_id: &str,
        id: &str,
        update: UpdateStockItem,
    ) -> AppResult<StockItem> {
        Self::validate_update(&update)?;

        ItemRepository::update(pool, id, user_id, &update)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".to_string()))
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str, id: &str) -> AppResult<()> {
        if !ItemRepository::delete(pool, id, user_id).await? {
            return Err(AppError::NotFound("Item not found".to_string()));
        }
        tracing::debug!("Deleted item {} for user {}", id, user_id);
        Ok(())
    }
}
