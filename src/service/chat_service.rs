// service/chat_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, userdb::UserExt, DBClient},
    models::{
        chatmodels::{can_message, ChatMessage},
        usermodel::User,
    },
    realtime::{events, RealtimeHub},
    service::error::ServiceError,
    utils::sanitize::clean_text,
};

/// Shared by the REST endpoints and the socket frames.
#[derive(Debug, Clone)]
pub struct ChatService {
    db_client: Arc<DBClient>,
    realtime: Arc<RealtimeHub>,
}

impl ChatService {
    pub fn new(db_client: Arc<DBClient>, realtime: Arc<RealtimeHub>) -> Self {
        Self { db_client, realtime }
    }

    pub async fn send(
        &self,
        sender: &User,
        receiver_id: Uuid,
        text: &str,
    ) -> Result<ChatMessage, ServiceError> {
        if sender.id == receiver_id {
            return Err(ServiceError::Validation("You cannot message yourself".to_string()));
        }

        let text = clean_text(text);
        if text.is_empty() {
            return Err(ServiceError::Validation("Message cannot be empty".to_string()));
        }

        let receiver = self
            .db_client
            .get_user(Some(receiver_id), None)
            .await?
            .filter(|user| user.is_active)
            .ok_or(ServiceError::UserNotFound(receiver_id))?;

        if !can_message(sender.role, receiver.role) {
            return Err(ServiceError::Forbidden("You can only message support staff".to_string()));
        }

        let message = self
            .db_client
            .save_message(sender.id, receiver.id, &text)
            .await?;

        self.realtime
            .emit_to_user(receiver.id, events::CHAT_MESSAGE, &message)
            .await;
        self.realtime
            .emit_to_user(sender.id, events::CHAT_MESSAGE, &message)
            .await;

        Ok(message)
    }

    /// Marks what `sender_id` sent to `reader` as read and tells the sender.
    pub async fn mark_read(&self, reader: &User, sender_id: Uuid) -> Result<u64, ServiceError> {
        let updated = self.db_client.mark_read(reader.id, sender_id).await?;

        if updated > 0 {
            self.realtime
                .emit_to_user(
                    sender_id,
                    events::CHAT_READ,
                    &serde_json::json!({ "reader_id": reader.id, "count": updated }),
                )
                .await;
        }

        Ok(updated)
    }
}
