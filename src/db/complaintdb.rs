// db/complaintdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DBClient;
use crate::{
    dtos::{complaintdtos::ComplaintImageDto, page_offset},
    models::complaintmodel::{Complaint, ComplaintImage, ComplaintStatus, ServiceSnapshot},
};

/// Fields a new complaint is created from.
pub struct NewComplaint<'a> {
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub booking_id: Uuid,
    pub subject: &'a str,
    pub description: &'a str,
    pub snapshot: &'a ServiceSnapshot,
    pub images: &'a [ComplaintImageDto],
}

#[async_trait]
pub trait ComplaintExt {
    async fn create_complaint(
        &self,
        complaint: NewComplaint<'_>,
    ) -> Result<(Complaint, Vec<ComplaintImage>), sqlx::Error>;

    async fn get_complaint(&self, complaint_id: Uuid) -> Result<Option<Complaint>, sqlx::Error>;

    async fn get_complaint_images(
        &self,
        complaint_id: Uuid,
    ) -> Result<Vec<ComplaintImage>, sqlx::Error>;

    async fn get_user_complaints(
        &self,
        user_id: Uuid,
        status: Option<ComplaintStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<Complaint>, i64), sqlx::Error>;

    async fn get_complaints(
        &self,
        status: Option<ComplaintStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<Complaint>, i64), sqlx::Error>;

    /// Conditional move from `from` to `to`; `None` when the row had
    /// already changed.
    async fn update_complaint_status(
        &self,
        complaint_id: Uuid,
        from: ComplaintStatus,
        to: ComplaintStatus,
        admin_response: Option<String>,
    ) -> Result<Option<Complaint>, sqlx::Error>;

    async fn has_pending_complaint(&self, booking_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn delete_complaint(
        &self,
        complaint_id: Uuid,
        status: ComplaintStatus,
    ) -> Result<bool, sqlx::Error>;

    /// Complaints filed by the user plus those against the services of the
    /// company they own.
    async fn count_active_complaints_for_user(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;

    async fn count_active_complaints_for_service(
        &self,
        service_id: Uuid,
    ) -> Result<i64, sqlx::Error>;

    async fn auto_resolve_stale(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Complaint>, sqlx::Error>;
}

#[async_trait]
impl ComplaintExt for DBClient {
    async fn create_complaint(
        &self,
        complaint: NewComplaint<'_>,
    ) -> Result<(Complaint, Vec<ComplaintImage>), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Complaint>(
            r#"
            INSERT INTO complaints
                (user_id, service_id, booking_id, subject, description,
                 snapshot_service_name, snapshot_service_category,
                 snapshot_service_price, snapshot_company_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(complaint.user_id)
        .bind(complaint.service_id)
        .bind(complaint.booking_id)
        .bind(complaint.subject)
        .bind(complaint.description)
        .bind(&complaint.snapshot.service_name)
        .bind(&complaint.snapshot.service_category)
        .bind(&complaint.snapshot.service_price)
        .bind(&complaint.snapshot.company_name)
        .fetch_one(&mut *tx)
        .await?;

        let mut images = Vec::with_capacity(complaint.images.len());
        for image in complaint.images {
            let saved = sqlx::query_as::<_, ComplaintImage>(
                r#"
                INSERT INTO complaint_images (complaint_id, url, delete_handle)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(created.id)
            .bind(&image.url)
            .bind(image.delete_handle.as_deref())
            .fetch_one(&mut *tx)
            .await?;
            images.push(saved);
        }

        tx.commit().await?;
        Ok((created, images))
    }

    async fn get_complaint(&self, complaint_id: Uuid) -> Result<Option<Complaint>, sqlx::Error> {
        sqlx::query_as::<_, Complaint>(r#"SELECT * FROM complaints WHERE id = $1"#)
            .bind(complaint_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_complaint_images(
        &self,
        complaint_id: Uuid,
    ) -> Result<Vec<ComplaintImage>, sqlx::Error> {
        sqlx::query_as::<_, ComplaintImage>(
            r#"SELECT * FROM complaint_images WHERE complaint_id = $1"#,
        )
        .bind(complaint_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_complaints(
        &self,
        user_id: Uuid,
        status: Option<ComplaintStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<Complaint>, i64), sqlx::Error> {
        let complaints = sqlx::query_as::<_, Complaint>(
            r#"
            SELECT * FROM complaints
            WHERE user_id = $1 AND ($2::complaint_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM complaints
            WHERE user_id = $1 AND ($2::complaint_status IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((complaints, total))
    }

    async fn get_complaints(
        &self,
        status: Option<ComplaintStatus>,
        page: u32,
        limit: usize,
    ) -> Result<(Vec<Complaint>, i64), sqlx::Error> {
        let complaints = sqlx::query_as::<_, Complaint>(
            r#"
            SELECT * FROM complaints
            WHERE ($1::complaint_status IS NULL OR status = $1)
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(limit as i64)
        .bind(page_offset(page, limit))
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM complaints WHERE ($1::complaint_status IS NULL OR status = $1)"#,
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((complaints, total))
    }

    async fn update_complaint_status(
        &self,
        complaint_id: Uuid,
        from: ComplaintStatus,
        to: ComplaintStatus,
        admin_response: Option<String>,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        sqlx::query_as::<_, Complaint>(
            r#"
            UPDATE complaints
            SET status = $3,
                admin_response = COALESCE($4, admin_response),
                resolved_at = CASE WHEN $3 = 'resolved' THEN NOW() ELSE resolved_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(complaint_id)
        .bind(from)
        .bind(to)
        .bind(admin_response)
        .fetch_optional(&self.pool)
        .await
    }

    async fn has_pending_complaint(&self, booking_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM complaints WHERE booking_id = $1 AND status = 'pending')"#,
        )
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_complaint(
        &self,
        complaint_id: Uuid,
        status: ComplaintStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM complaints WHERE id = $1 AND status = $2"#)
            .bind(complaint_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_active_complaints_for_user(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM complaints cp
            WHERE cp.status IN ('pending', 'in_progress', 'awaiting_confirmation')
              AND (
                cp.user_id = $1
                OR cp.service_id IN (
                    SELECT s.id FROM services s
                    JOIN companies c ON c.id = s.company_id
                    WHERE c.owner_id = $1
                )
              )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_active_complaints_for_service(
        &self,
        service_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM complaints
            WHERE service_id = $1
              AND status IN ('pending', 'in_progress', 'awaiting_confirmation')
            "#,
        )
        .bind(service_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn auto_resolve_stale(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Complaint>, sqlx::Error> {
        sqlx::query_as::<_, Complaint>(
            r#"
            UPDATE complaints
            SET status = 'resolved', resolved_at = NOW(), updated_at = NOW()
            WHERE status = 'awaiting_confirmation' AND updated_at < $1
            RETURNING *
            "#,
        )
        .bind(before)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::PgPool;

    use super::*;
    use crate::test_support::{file_complaint, seed_marketplace};

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn status_moves_only_from_the_expected_state(pool: PgPool) {
        let db = DBClient::new(pool);
        let market = seed_marketplace(&db).await;
        let complaint = file_complaint(&db, &market).await;

        let moved = db
            .update_complaint_status(complaint.id, ComplaintStatus::Pending, ComplaintStatus::InProgress, None)
            .await
            .unwrap();
        assert_eq!(moved.map(|c| c.status), Some(ComplaintStatus::InProgress));

        let stale = db
            .update_complaint_status(complaint.id, ComplaintStatus::Pending, ComplaintStatus::Resolved, None)
            .await
            .unwrap();
        assert!(stale.is_none());
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn active_counts_cover_filer_and_company_owner(pool: PgPool) {
        let db = DBClient::new(pool);
        let market = seed_marketplace(&db).await;
        let complaint = file_complaint(&db, &market).await;

        assert_eq!(db.count_active_complaints_for_user(market.customer.id).await.unwrap(), 1);
        assert_eq!(db.count_active_complaints_for_user(market.owner.id).await.unwrap(), 1);
        assert_eq!(db.count_active_complaints_for_service(market.service.id).await.unwrap(), 1);

        db.update_complaint_status(complaint.id, ComplaintStatus::Pending, ComplaintStatus::Rejected, None)
            .await
            .unwrap();
        assert_eq!(db.count_active_complaints_for_user(market.owner.id).await.unwrap(), 0);
        assert_eq!(db.count_active_complaints_for_service(market.service.id).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn one_pending_complaint_per_booking(pool: PgPool) {
        let db = DBClient::new(pool);
        let market = seed_marketplace(&db).await;
        file_complaint(&db, &market).await;

        assert!(db.has_pending_complaint(market.booking.id).await.unwrap());

        let snapshot = ServiceSnapshot {
            service_name: market.service.name.clone(),
            service_category: market.service.category.clone(),
            service_price: market.service.price.clone(),
            company_name: market.company.name.clone(),
        };
        let duplicate = db
            .create_complaint(NewComplaint {
                user_id: market.customer.id,
                service_id: market.service.id,
                booking_id: market.booking.id,
                subject: "Again",
                description: "Still not cleaned",
                snapshot: &snapshot,
                images: &[],
            })
            .await;
        let Err(sqlx::Error::Database(err)) = duplicate else {
            panic!("second pending complaint was accepted");
        };
        assert!(err.is_unique_violation());
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn stale_confirmations_resolve_themselves(pool: PgPool) {
        let db = DBClient::new(pool);
        let market = seed_marketplace(&db).await;
        let complaint = file_complaint(&db, &market).await;

        db.update_complaint_status(
            complaint.id,
            ComplaintStatus::Pending,
            ComplaintStatus::AwaitingConfirmation,
            Some("Cleaner went back".to_string()),
        )
        .await
        .unwrap();

        assert!(db.auto_resolve_stale(Utc::now() - Duration::days(1)).await.unwrap().is_empty());

        let resolved = db.auto_resolve_stale(Utc::now() + Duration::minutes(1)).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].status, ComplaintStatus::Resolved);
        assert!(resolved[0].resolved_at.is_some());
    }
}
