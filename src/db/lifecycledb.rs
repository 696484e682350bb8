// db/lifecycledb.rs
//
// Multi-table removals. Every method runs in a single transaction so a
// failure halfway leaves the data untouched.
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use super::{servicedb::recompute_rating, DBClient};
use crate::models::{companymodel::Company, usermodel::User};

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct UserRemovalReport {
    pub complaints_closed: u64,
    pub services_removed: u64,
    pub ratings_recomputed: u64,
}

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ServiceRemovalReport {
    pub complaints_closed: u64,
    pub complaints_purged: u64,
}

#[async_trait]
pub trait LifecycleExt {
    /// Deactivates the account, its sessions and any company it owns.
    /// Shared by self-deletion and admin suspension.
    async fn deactivate_user(
        &self,
        user_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
    ) -> Result<User, sqlx::Error>;

    async fn force_delete_user(&self, user_id: Uuid) -> Result<UserRemovalReport, sqlx::Error>;

    async fn deactivate_company(&self, company_id: Uuid) -> Result<(Company, u64), sqlx::Error>;

    async fn hard_delete_service(&self, service_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn force_delete_service(
        &self,
        service_id: Uuid,
    ) -> Result<ServiceRemovalReport, sqlx::Error>;
}

#[async_trait]
impl LifecycleExt for DBClient {
    async fn deactivate_user(
        &self,
        user_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
    ) -> Result<User, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = FALSE,
                deactivated_at = NOW(),
                deactivated_by = $2,
                deactivation_reason = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(actor_id)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE sessions SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL"#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE services SET is_active = FALSE, updated_at = NOW()
            WHERE company_id IN (SELECT id FROM companies WHERE owner_id = $1)
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE companies SET is_active = FALSE, updated_at = NOW() WHERE owner_id = $1"#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn force_delete_user(&self, user_id: Uuid) -> Result<UserRemovalReport, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // open complaints against the user's own services lose their subject
        let complaints_closed = sqlx::query(
            r#"
            UPDATE complaints
            SET status = 'service_unavailable', updated_at = NOW()
            WHERE status IN ('pending', 'in_progress', 'awaiting_confirmation')
              AND user_id <> $1
              AND service_id IN (
                  SELECT s.id FROM services s
                  JOIN companies c ON c.id = s.company_id
                  WHERE c.owner_id = $1
              )
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let services_removed = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM services s
            JOIN companies c ON c.id = s.company_id
            WHERE c.owner_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        // ratings on other companies' services vanish with the user
        let rated = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT r.service_id FROM service_ratings r
            JOIN services s ON s.id = r.service_id
            JOIN companies c ON c.id = s.company_id
            WHERE r.user_id = $1 AND c.owner_id <> $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for service_id in &rated {
            recompute_rating(&mut tx, *service_id).await?;
        }

        tx.commit().await?;

        Ok(UserRemovalReport {
            complaints_closed,
            services_removed: services_removed as u64,
            ratings_recomputed: rated.len() as u64,
        })
    }

    async fn deactivate_company(&self, company_id: Uuid) -> Result<(Company, u64), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(company_id)
        .fetch_one(&mut *tx)
        .await?;

        let services = sqlx::query(
            r#"
            UPDATE services SET is_active = FALSE, updated_at = NOW()
            WHERE company_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(company_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok((company, services))
    }

    async fn hard_delete_service(&self, service_id: Uuid) -> Result<bool, sqlx::Error> {
        // bookings and complaints keep their snapshot; the reference is nulled
        let result = sqlx::query(r#"DELETE FROM services WHERE id = $1"#)
            .bind(service_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn force_delete_service(
        &self,
        service_id: Uuid,
    ) -> Result<ServiceRemovalReport, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let complaints_closed = sqlx::query(
            r#"
            UPDATE complaints
            SET status = 'service_unavailable', updated_at = NOW()
            WHERE service_id = $1
              AND status IN ('pending', 'in_progress', 'awaiting_confirmation')
            "#,
        )
        .bind(service_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let complaints_purged = sqlx::query(
            r#"DELETE FROM complaints WHERE service_id = $1 AND status = 'resolved'"#,
        )
        .bind(service_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let removed = sqlx::query(r#"DELETE FROM services WHERE id = $1"#)
            .bind(service_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;
        Ok(ServiceRemovalReport {
            complaints_closed,
            complaints_purged,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use sqlx::PgPool;

    use super::*;
    use crate::{
        db::{
            companydb::CompanyExt, complaintdb::ComplaintExt, servicedb::ServiceExt,
            userdb::UserExt, verificationdb::VerificationExt,
        },
        models::complaintmodel::ComplaintStatus,
        test_support::{file_complaint, seed_marketplace},
    };

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn deactivating_an_owner_takes_the_company_down(pool: PgPool) {
        let db = DBClient::new(pool);
        let market = seed_marketplace(&db).await;
        let session = db
            .create_session(Uuid::new_v4(), market.owner.id, None, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        let user = db
            .deactivate_user(market.owner.id, market.customer.id, Some("Fraud".to_string()))
            .await
            .unwrap();
        assert!(!user.is_active);
        assert_eq!(user.deactivated_by, Some(market.customer.id));

        let session = db.get_session(session.id).await.unwrap().unwrap();
        assert!(!session.is_live(Utc::now()));

        let company = db.get_company(market.company.id).await.unwrap().unwrap();
        assert!(!company.is_active);
        let listing = db.get_service_listing(market.service.id).await.unwrap().unwrap();
        assert!(!listing.service.is_active);
        assert!(!listing.is_public());
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn force_removal_closes_open_and_purges_resolved(pool: PgPool) {
        let db = DBClient::new(pool);
        let market = seed_marketplace(&db).await;

        let settled = file_complaint(&db, &market).await;
        db.update_complaint_status(settled.id, ComplaintStatus::Pending, ComplaintStatus::Resolved, None)
            .await
            .unwrap();
        let open = file_complaint(&db, &market).await;

        let report = db.force_delete_service(market.service.id).await.unwrap();
        assert_eq!(
            report,
            ServiceRemovalReport {
                complaints_closed: 1,
                complaints_purged: 1,
            }
        );

        let open = db.get_complaint(open.id).await.unwrap().unwrap();
        assert_eq!(open.status, ComplaintStatus::ServiceUnavailable);
        assert!(db.get_complaint(settled.id).await.unwrap().is_none());
        assert!(db.get_service(market.service.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn force_deleting_an_owner_reports_what_went(pool: PgPool) {
        let db = DBClient::new(pool);
        let market = seed_marketplace(&db).await;
        file_complaint(&db, &market).await;

        let report = db.force_delete_user(market.owner.id).await.unwrap();
        assert_eq!(report.complaints_closed, 1);
        assert_eq!(report.services_removed, 1);
        assert!(db.get_user(Some(market.owner.id), None).await.unwrap().is_none());
        assert_eq!(db.count_active_complaints_for_user(market.customer.id).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn company_deactivation_counts_live_services(pool: PgPool) {
        let db = DBClient::new(pool);
        let market = seed_marketplace(&db).await;

        let (company, services) = db.deactivate_company(market.company.id).await.unwrap();
        assert!(!company.is_active);
        assert_eq!(services, 1);

        let (_, services) = db.deactivate_company(market.company.id).await.unwrap();
        assert_eq!(services, 0);
    }
}
