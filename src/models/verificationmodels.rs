// models/verificationmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::usermodel::UserRole;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "otp_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Signup,
    PasswordReset,
}

impl OtpPurpose {
    pub fn to_str(&self) -> &str {
        match self {
            OtpPurpose::Signup => "signup",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct OtpRecord {
    pub id: Uuid,
    pub email: String,
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Signup data parked until the emailed code is confirmed.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct PendingUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: UserRole,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct CleanupReport {
    pub otps: u64,
    pub pending_users: u64,
    pub sessions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration, revoked: bool) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_agent: None,
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn live_session_requires_unrevoked_and_unexpired() {
        let now = Utc::now();
        assert!(session(Duration::minutes(5), false).is_live(now));
        assert!(!session(Duration::minutes(5), true).is_live(now));
        assert!(!session(Duration::minutes(-5), false).is_live(now));
    }
}
