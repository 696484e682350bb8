// db/userdb.rs
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::DBClient;
use crate::{
    dtos::{page_offset, userdtos::UpdateProfileDto},
    models::{chatmodels::ChatParticipant, usermodel::{User, UserRole}},
};

#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl UserFilter {
    fn push_where<'a>(&'a self, builder: &mut QueryBuilder<'a, Postgres>) {
        builder.push(" WHERE TRUE");
        if let Some(role) = self.role {
            builder.push(" AND role = ").push_bind(role);
        }
        if let Some(is_active) = self.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_users(
        &self,
        filter: &UserFilter,
        page: u32,
        limit: usize,
    ) -> Result<Vec<User>, sqlx::Error>;

    async fn get_user_count(&self, filter: &UserFilter) -> Result<i64, sqlx::Error>;

    async fn save_user<T: Into<String> + Send>(
        &self,
        name: T,
        email: T,
        password: T,
        role: UserRole,
    ) -> Result<User, sqlx::Error>;

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        profile: &UpdateProfileDto,
    ) -> Result<User, sqlx::Error>;

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password: String,
    ) -> Result<User, sqlx::Error>;

    async fn update_user_role(
        &self,
        target_id: Uuid,
        role: UserRole,
    ) -> Result<User, sqlx::Error>;

    async fn set_user_active(
        &self,
        user_id: Uuid,
        is_active: bool,
        actor_id: Option<Uuid>,
        reason: Option<String>,
    ) -> Result<User, sqlx::Error>;

    async fn get_staff(&self) -> Result<Vec<ChatParticipant>, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE LOWER(email) = LOWER($1)"#)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(user)
    }

    async fn get_users(
        &self,
        filter: &UserFilter,
        page: u32,
        limit: usize,
    ) -> Result<Vec<User>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM users");
        filter.push_where(&mut builder);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(page_offset(page, limit));

        builder.build_query_as::<User>().fetch_all(&self.pool).await
    }

    async fn get_user_count(&self, filter: &UserFilter) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        filter.push_where(&mut builder);

        builder.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    async fn save_user<T: Into<String> + Send>(
        &self,
        name: T,
        email: T,
        password: T,
        role: UserRole,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, role)
            VALUES ($1, LOWER($2), $3, $4)
            RETURNING *
            "#,
        )
        .bind(name.into())
        .bind(email.into())
        .bind(password.into())
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        profile: &UpdateProfileDto,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(profile.name.as_deref())
        .bind(profile.phone.as_deref())
        .bind(profile.avatar_url.as_deref())
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_password(
        &self,
        user_id: Uuid,
        password: String,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(password)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_role(
        &self,
        target_id: Uuid,
        role: UserRole,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(target_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn set_user_active(
        &self,
        user_id: Uuid,
        is_active: bool,
        actor_id: Option<Uuid>,
        reason: Option<String>,
    ) -> Result<User, sqlx::Error> {
        // reactivation clears the deactivation metadata
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = $2,
                deactivated_at = CASE WHEN $2 THEN NULL ELSE NOW() END,
                deactivated_by = CASE WHEN $2 THEN NULL ELSE $3 END,
                deactivation_reason = CASE WHEN $2 THEN NULL ELSE $4 END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(is_active)
        .bind(actor_id)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_staff(&self) -> Result<Vec<ChatParticipant>, sqlx::Error> {
        sqlx::query_as::<_, ChatParticipant>(
            r#"
            SELECT id, name, role, avatar_url
            FROM users
            WHERE role IN ('admin', 'superuser') AND is_active = TRUE
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
