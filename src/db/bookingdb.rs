// db/bookingdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DBClient;
use crate::{
    dtos::page_offset,
    models::bookingmodel::{Booking, BookingDetails, BookingStatus},
};

const DETAILS_SELECT: &str = r#"
    SELECT b.id, b.user_id, u.name AS user_name,
           b.company_id, c.name AS company_name,
           b.service_id, s.name AS service_name,
           b.date, b.notes, b.status, b.created_at, b.updated_at
    FROM bookings b
    JOIN users u ON u.id = b.user_id
    LEFT JOIN companies c ON c.id = b.company_id
    LEFT JOIN services s ON s.id = b.service_id
"#;

#[async_trait]
pub trait BookingExt {
    async fn create_booking(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        service_id: Uuid,
        date: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<Booking, sqlx::Error>;

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error>;

    async fn get_booking_details(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<BookingDetails>, sqlx::Error>;

    async fn get_user_bookings(
        &self,
        user_id: Uuid,
        status: Option<BookingStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<BookingDetails>, i64), sqlx::Error>;

    async fn get_company_bookings(
        &self,
        company_id: Uuid,
        status: Option<BookingStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<BookingDetails>, i64), sqlx::Error>;

    /// Moves a booking only if it is still in `from`; `None` means someone
    /// else changed it first.
    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, sqlx::Error>;

    async fn has_completed_booking(
        &self,
        user_id: Uuid,
        service_id: Uuid,
    ) -> Result<bool, sqlx::Error>;
}

#[async_trait]
impl BookingExt for DBClient {
    async fn create_booking(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        service_id: Uuid,
        date: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<Booking, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (user_id, company_id, service_id, date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(service_id)
        .bind(date)
        .bind(notes)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(r#"SELECT * FROM bookings WHERE id = $1"#)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_booking_details(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<BookingDetails>, sqlx::Error> {
        let sql = format!("{} WHERE b.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_bookings(
        &self,
        user_id: Uuid,
        status: Option<BookingStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<BookingDetails>, i64), sqlx::Error> {
        let sql = format!(
            "{} WHERE b.user_id = $1 AND ($2::booking_status IS NULL OR b.status = $2) \
             ORDER BY b.date DESC LIMIT $3 OFFSET $4",
            DETAILS_SELECT
        );
        let bookings = sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(user_id)
            .bind(status)
            .bind(limit as i64)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE user_id = $1 AND ($2::booking_status IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((bookings, total))
    }

    async fn get_company_bookings(
        &self,
        company_id: Uuid,
        status: Option<BookingStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<BookingDetails>, i64), sqlx::Error> {
        let sql = format!(
            "{} WHERE b.company_id = $1 AND ($2::booking_status IS NULL OR b.status = $2) \
             ORDER BY b.date ASC LIMIT $3 OFFSET $4",
            DETAILS_SELECT
        );
        let bookings = sqlx::query_as::<_, BookingDetails>(&sql)
            .bind(company_id)
            .bind(status)
            .bind(limit as i64)
            .bind(page_offset(page, limit))
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE company_id = $1 AND ($2::booking_status IS NULL OR status = $2)
            "#,
        )
        .bind(company_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((bookings, total))
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }

    async fn has_completed_booking(
        &self,
        user_id: Uuid,
        service_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE user_id = $1 AND service_id = $2 AND status = 'completed'
            )
            "#,
        )
        .bind(user_id)
        .bind(service_id)
        .fetch_one(&self.pool)
        .await
    }
}
