// db/verificationdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DBClient;
use crate::models::{
    usermodel::UserRole,
    verificationmodels::{CleanupReport, OtpPurpose, OtpRecord, PendingUser, Session},
};

#[async_trait]
pub trait VerificationExt {
    // OTP Methods
    async fn create_otp(
        &self,
        email: &str,
        code_hash: String,
        purpose: OtpPurpose,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpRecord, sqlx::Error>;

    async fn get_latest_otp(
        &self,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, sqlx::Error>;

    async fn increment_otp_attempts(&self, otp_id: Uuid) -> Result<i32, sqlx::Error>;

    async fn delete_otp(&self, otp_id: Uuid) -> Result<(), sqlx::Error>;

    // Pending signups
    async fn upsert_pending_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: UserRole,
        expires_at: DateTime<Utc>,
    ) -> Result<PendingUser, sqlx::Error>;

    async fn get_pending_user(&self, email: &str) -> Result<Option<PendingUser>, sqlx::Error>;

    async fn delete_pending_user(&self, email: &str) -> Result<(), sqlx::Error>;

    // Sessions
    async fn create_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        user_agent: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, sqlx::Error>;

    async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>, sqlx::Error>;

    async fn revoke_session(&self, session_id: Uuid) -> Result<(), sqlx::Error>;

    async fn revoke_user_sessions(&self, user_id: Uuid) -> Result<u64, sqlx::Error>;

    async fn cleanup_expired(&self) -> Result<CleanupReport, sqlx::Error>;
}

#[async_trait]
impl VerificationExt for DBClient {
    async fn create_otp(
        &self,
        email: &str,
        code_hash: String,
        purpose: OtpPurpose,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpRecord, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // a fresh code replaces every earlier one for the same purpose
        sqlx::query(r#"DELETE FROM otp_codes WHERE LOWER(email) = LOWER($1) AND purpose = $2"#)
            .bind(email)
            .bind(purpose)
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, OtpRecord>(
            r#"
            INSERT INTO otp_codes (email, code_hash, purpose, expires_at)
            VALUES (LOWER($1), $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(code_hash)
        .bind(purpose)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn get_latest_otp(
        &self,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, sqlx::Error> {
        sqlx::query_as::<_, OtpRecord>(
            r#"
            SELECT * FROM otp_codes
            WHERE email = LOWER($1) AND purpose = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await
    }

    async fn increment_otp_attempts(&self, otp_id: Uuid) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"UPDATE otp_codes SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts"#,
        )
        .bind(otp_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_otp(&self, otp_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(r#"DELETE FROM otp_codes WHERE id = $1"#)
            .bind(otp_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_pending_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: UserRole,
        expires_at: DateTime<Utc>,
    ) -> Result<PendingUser, sqlx::Error> {
        sqlx::query_as::<_, PendingUser>(
            r#"
            INSERT INTO pending_users (email, name, password, role, expires_at)
            VALUES (LOWER($1), $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name,
                password = EXCLUDED.password,
                role = EXCLUDED.role,
                expires_at = EXCLUDED.expires_at
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password)
        .bind(role)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_pending_user(&self, email: &str) -> Result<Option<PendingUser>, sqlx::Error> {
        sqlx::query_as::<_, PendingUser>(
            r#"SELECT * FROM pending_users WHERE email = LOWER($1) AND expires_at > NOW()"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_pending_user(&self, email: &str) -> Result<(), sqlx::Error> {
        sqlx::query(r#"DELETE FROM pending_users WHERE email = LOWER($1)"#)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        user_agent: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, user_agent, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(user_agent)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(r#"SELECT * FROM sessions WHERE id = $1"#)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn revoke_session(&self, session_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL"#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE sessions SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL"#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn cleanup_expired(&self) -> Result<CleanupReport, sqlx::Error> {
        let otps = sqlx::query(r#"DELETE FROM otp_codes WHERE expires_at < NOW()"#)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let pending_users = sqlx::query(r#"DELETE FROM pending_users WHERE expires_at < NOW()"#)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let sessions = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < NOW()
               OR revoked_at < NOW() - INTERVAL '1 day'
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(CleanupReport {
            otps,
            pending_users,
            sessions,
        })
    }
}
