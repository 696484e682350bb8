// db/admindb.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use super::DBClient;
use crate::models::{
    bookingmodel::BookingStatus, complaintmodel::ComplaintStatus, usermodel::UserRole,
};

#[derive(Debug, Default, Clone, Serialize)]
pub struct PlatformStats {
    pub users_by_role: BTreeMap<String, i64>,
    pub total_users: i64,
    pub companies: i64,
    pub verified_companies: i64,
    pub services: i64,
    pub active_services: i64,
    pub bookings_by_status: BTreeMap<String, i64>,
    pub complaints_by_status: BTreeMap<String, i64>,
}

#[async_trait]
pub trait AdminExt {
    async fn get_platform_stats(&self) -> Result<PlatformStats, sqlx::Error>;
}

#[async_trait]
impl AdminExt for DBClient {
    async fn get_platform_stats(&self) -> Result<PlatformStats, sqlx::Error> {
        let roles = sqlx::query_as::<_, (UserRole, i64)>(
            r#"SELECT role, COUNT(*) FROM users GROUP BY role"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let (companies, verified_companies) = sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COUNT(*), COUNT(*) FILTER (WHERE is_verified) FROM companies"#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (services, active_services) = sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM services"#,
        )
        .fetch_one(&self.pool)
        .await?;

        let bookings = sqlx::query_as::<_, (BookingStatus, i64)>(
            r#"SELECT status, COUNT(*) FROM bookings GROUP BY status"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let complaints = sqlx::query_as::<_, (ComplaintStatus, i64)>(
            r#"SELECT status, COUNT(*) FROM complaints GROUP BY status"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let users_by_role: BTreeMap<String, i64> = roles
            .into_iter()
            .map(|(role, count)| (role.to_str().to_string(), count))
            .collect();

        Ok(PlatformStats {
            total_users: users_by_role.values().sum(),
            users_by_role,
            companies,
            verified_companies,
            services,
            active_services,
            bookings_by_status: bookings
                .into_iter()
                .map(|(status, count)| (status.to_str().to_string(), count))
                .collect(),
            complaints_by_status: complaints
                .into_iter()
                .map(|(status, count)| (status.to_str().to_string(), count))
                .collect(),
        })
    }
}
