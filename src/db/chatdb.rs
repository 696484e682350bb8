// db/chatdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::{
    dtos::page_offset,
    models::chatmodels::{ChatMessage, Conversation},
};

#[async_trait]
pub trait ChatExt {
    async fn save_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        text: &str,
    ) -> Result<ChatMessage, sqlx::Error>;

    /// Newest first; callers reverse for display.
    async fn get_messages_between(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, sqlx::Error>;

    async fn get_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, sqlx::Error>;

    /// Marks everything `sender_id` sent to `receiver_id` as read.
    async fn mark_read(&self, receiver_id: Uuid, sender_id: Uuid) -> Result<u64, sqlx::Error>;

    async fn unread_count(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn save_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        text: &str,
    ) -> Result<ChatMessage, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (sender_id, receiver_id, text)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_messages_between(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        page: u32,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT * FROM chat_messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(other_id)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, sqlx::Error> {
        sqlx::query_as::<_, Conversation>(
            r#"
            WITH thread AS (
                SELECT m.*,
                       CASE WHEN m.sender_id = $1 THEN m.receiver_id ELSE m.sender_id END AS counterpart_id
                FROM chat_messages m
                WHERE m.sender_id = $1 OR m.receiver_id = $1
            ),
            latest AS (
                SELECT DISTINCT ON (counterpart_id)
                       counterpart_id, text, sender_id, created_at
                FROM thread
                ORDER BY counterpart_id, created_at DESC
            ),
            unread AS (
                SELECT sender_id AS counterpart_id, COUNT(*) AS unread_count
                FROM chat_messages
                WHERE receiver_id = $1 AND is_read = FALSE
                GROUP BY sender_id
            )
            SELECT l.counterpart_id,
                   u.name AS counterpart_name,
                   u.role AS counterpart_role,
                   u.avatar_url AS counterpart_avatar,
                   l.text AS last_message,
                   l.sender_id AS last_sender_id,
                   l.created_at AS last_message_at,
                   COALESCE(n.unread_count, 0) AS unread_count
            FROM latest l
            JOIN users u ON u.id = l.counterpart_id
            LEFT JOIN unread n ON n.counterpart_id = l.counterpart_id
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_read(&self, receiver_id: Uuid, sender_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE chat_messages
            SET is_read = TRUE
            WHERE receiver_id = $1 AND sender_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(receiver_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM chat_messages WHERE receiver_id = $1 AND is_read = FALSE"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }
}
