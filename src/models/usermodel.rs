use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Provider,
    Admin,
    Superuser,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::User => "user",
            UserRole::Provider => "provider",
            UserRole::Admin => "admin",
            UserRole::Superuser => "superuser",
        }
    }

    /// Admins and superusers moderate the marketplace.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Superuser)
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_by: Option<uuid::Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivation_reason: Option<String>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles() {
        assert!(UserRole::Admin.is_staff());
        assert!(UserRole::Superuser.is_staff());
        assert!(!UserRole::Provider.is_staff());
        assert!(!UserRole::User.is_staff());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&UserRole::Superuser).unwrap();
        assert_eq!(json, "\"superuser\"");
        let role: UserRole = serde_json::from_str("\"provider\"").unwrap();
        assert_eq!(role, UserRole::Provider);
    }
}
