use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub target_quantity: f64,
    pub current_quantity: f64,
    pub unit: String,
    pub home_location: String,
    pub home_order: i64,
    pub store_section: String,
    pub store_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Missing fields fall back to their defaults and are then rejected by
/// validation with a 400, not by the JSON extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateStockItem {
    pub name: String,
    pub target_quantity: f64,
    pub current_quantity: Option<f64>,
    pub unit: String,
    pub home_location: Option<String>,
    pub store_section: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockItem {
    pub name: Option<String>,
    pub target_quantity: Option<f64>,
    pub current_quantity: Option<f64>,
    pub unit: Option<String>,
    pub home_location: Option<String>,
    pub home_order: Option<i64>,
    pub store_section: Option<String>,
    pub store_order: Option<i64>,
}
