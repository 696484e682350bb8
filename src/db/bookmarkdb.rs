// db/bookmarkdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::models::bookmarkmodel::{Bookmark, BookmarkedService};

#[async_trait]
pub trait BookmarkExt {
    async fn add_bookmark(&self, user_id: Uuid, service_id: Uuid) -> Result<Bookmark, sqlx::Error>;

    async fn remove_bookmark(&self, user_id: Uuid, service_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn get_bookmarks(&self, user_id: Uuid) -> Result<Vec<BookmarkedService>, sqlx::Error>;

    async fn is_bookmarked(&self, user_id: Uuid, service_id: Uuid) -> Result<bool, sqlx::Error>;
}

#[async_trait]
impl BookmarkExt for DBClient {
    async fn add_bookmark(&self, user_id: Uuid, service_id: Uuid) -> Result<Bookmark, sqlx::Error> {
        sqlx::query_as::<_, Bookmark>(
            r#"
            INSERT INTO bookmarks (user_id, service_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(service_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn remove_bookmark(&self, user_id: Uuid, service_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM bookmarks WHERE user_id = $1 AND service_id = $2"#)
            .bind(user_id)
            .bind(service_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_bookmarks(&self, user_id: Uuid) -> Result<Vec<BookmarkedService>, sqlx::Error> {
        sqlx::query_as::<_, BookmarkedService>(
            r#"
            SELECT b.id AS bookmark_id, s.id AS service_id, s.name, s.category, s.price,
                   s.image_url, s.rating_average, c.name AS company_name,
                   (s.is_active AND c.is_active) AS is_active,
                   b.created_at AS bookmarked_at
            FROM bookmarks b
            JOIN services s ON s.id = b.service_id
            JOIN companies c ON c.id = s.company_id
            WHERE b.user_id = $1
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn is_bookmarked(&self, user_id: Uuid, service_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM bookmarks WHERE user_id = $1 AND service_id = $2)"#,
        )
        .bind(user_id)
        .bind(service_id)
        .fetch_one(&self.pool)
        .await
    }
}
