use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Service {
    pub id: Uuid,
    pub company_id: Uuid,
    pub created_by: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: BigDecimal,
    pub duration_minutes: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub rating_average: f64,
    pub rating_count: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Service joined with the owning company's public fields.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ServiceListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub service: Service,
    pub company_name: String,
    pub company_verified: bool,
    #[serde(skip_serializing)]
    pub company_active: bool,
}

impl ServiceListing {
    /// Shown to anonymous visitors: the service and its company are both live.
    pub fn is_public(&self) -> bool {
        self.service.is_active && self.company_active
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Rating {
    pub service_id: Uuid,
    pub user_id: Uuid,
    pub value: i16,
    pub review: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A rating joined with the reviewer's display name.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct RatingWithUser {
    pub user_id: Uuid,
    pub user_name: String,
    pub value: i16,
    pub review: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// How a service (or its owner) is removed.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Mark inactive; blocked while complaints are unresolved.
    #[default]
    Soft,
    /// Remove the row; blocked while complaints are unresolved.
    Hard,
    /// Remove the row regardless, compensating open complaints first.
    Force,
}

/// Outcome of the pre-delete check.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCheck {
    pub can_delete: bool,
    pub active_complaints: i64,
}

impl DeleteCheck {
    pub fn from_count(active_complaints: i64) -> Self {
        DeleteCheck {
            can_delete: active_complaints == 0,
            active_complaints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(service_active: bool, company_active: bool) -> ServiceListing {
        ServiceListing {
            service: Service {
                id: Uuid::new_v4(),
                company_id: Uuid::new_v4(),
                created_by: None,
                name: "Deep clean".into(),
                description: "Whole flat".into(),
                category: "cleaning".into(),
                price: BigDecimal::from(120),
                duration_minutes: Some(180),
                image_url: None,
                is_active: service_active,
                rating_average: 0.0,
                rating_count: 0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            company_name: "Spotless".into(),
            company_verified: true,
            company_active,
        }
    }

    #[test]
    fn deactivated_company_hides_its_services() {
        assert!(listing(true, true).is_public());
        assert!(!listing(true, false).is_public());
        assert!(!listing(false, true).is_public());
    }

    #[test]
    fn delete_check_blocks_on_open_complaints() {
        assert!(DeleteCheck::from_count(0).can_delete);
        let blocked = DeleteCheck::from_count(3);
        assert!(!blocked.can_delete);
        assert_eq!(blocked.active_complaints, 3);
    }

    #[test]
    fn delete_mode_defaults_to_soft() {
        assert_eq!(DeleteMode::default(), DeleteMode::Soft);
        let mode: DeleteMode = serde_json::from_str("\"force\"").unwrap();
        assert_eq!(mode, DeleteMode::Force);
    }
}
