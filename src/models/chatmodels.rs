// models/chatmodels.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::usermodel::UserRole;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: String,
    pub is_read: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// One row per counterpart, derived from the message log.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Conversation {
    pub counterpart_id: Uuid,
    pub counterpart_name: String,
    pub counterpart_role: UserRole,
    pub counterpart_avatar: Option<String>,
    pub last_message: String,
    pub last_sender_id: Uuid,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ChatParticipant {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
}

/// Users may only talk to staff; staff may talk to anyone.
pub fn can_message(sender: UserRole, receiver: UserRole) -> bool {
    sender.is_staff() || receiver.is_staff()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_pairs_need_a_staff_member() {
        assert!(can_message(UserRole::User, UserRole::Admin));
        assert!(can_message(UserRole::Provider, UserRole::Superuser));
        assert!(can_message(UserRole::Admin, UserRole::Provider));
        assert!(!can_message(UserRole::User, UserRole::Provider));
        assert!(!can_message(UserRole::User, UserRole::User));
    }
}
