use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Bookmark {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct BookmarkedService {
    pub bookmark_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub image_url: Option<String>,
    pub rating_average: f64,
    pub company_name: String,
    pub is_active: bool,
    #[serde(rename = "bookmarkedAt")]
    pub bookmarked_at: DateTime<Utc>,
}
