// service/lifecycle_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        companydb::CompanyExt,
        complaintdb::ComplaintExt,
        lifecycledb::{LifecycleExt, ServiceRemovalReport, UserRemovalReport},
        servicedb::ServiceExt,
        userdb::UserExt,
        DBClient,
    },
    models::{
        companymodel::Company,
        servicemodel::{DeleteCheck, DeleteMode},
        usermodel::{User, UserRole},
    },
    service::error::ServiceError,
};

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UserDeletion {
    Deactivated { user_id: Uuid },
    Removed { user_id: Uuid, report: UserRemovalReport },
}

#[derive(Debug, Serialize)]
pub struct ServiceDeletion {
    pub service_id: Uuid,
    pub mode: DeleteMode,
    #[serde(flatten)]
    pub report: ServiceRemovalReport,
}

/// Who may remove `target`: the account itself or staff, but only a
/// superuser may remove another staff account. Force needs staff.
pub fn may_delete_user(actor: &User, target: &User, force: bool) -> Result<(), ServiceError> {
    let is_self = actor.id == target.id;

    if force {
        if !actor.role.is_staff() {
            return Err(ServiceError::Forbidden("Only staff can force delete accounts".to_string()));
        }
        if is_self {
            return Err(ServiceError::Forbidden("You cannot force delete your own account".to_string()));
        }
    }

    if is_self {
        return Ok(());
    }
    if !actor.role.is_staff() {
        return Err(ServiceError::Forbidden("You cannot delete another account".to_string()));
    }
    if target.role.is_staff() && actor.role != UserRole::Superuser {
        return Err(ServiceError::Forbidden("Only a superuser can remove staff accounts".to_string()));
    }
    Ok(())
}

/// Owners may soft or hard delete their services; force is staff only.
pub fn may_delete_service(actor: &User, company_owner: Uuid, mode: DeleteMode) -> Result<(), ServiceError> {
    if mode == DeleteMode::Force && !actor.role.is_staff() {
        return Err(ServiceError::Forbidden("Only staff can force delete a service".to_string()));
    }
    if actor.id != company_owner && !actor.role.is_staff() {
        return Err(ServiceError::Forbidden("You can only delete your own services".to_string()));
    }
    Ok(())
}

/// Account removal is a deactivation unless forced.
pub fn user_delete_mode(force: bool) -> DeleteMode {
    if force {
        DeleteMode::Force
    } else {
        DeleteMode::Soft
    }
}

/// Soft and hard removals wait for open complaints; force goes through.
pub fn complaint_gate(mode: DeleteMode, check: DeleteCheck) -> Result<(), ServiceError> {
    if mode == DeleteMode::Force || check.can_delete {
        Ok(())
    } else {
        Err(ServiceError::ActiveComplaints(check.active_complaints))
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleService {
    db_client: Arc<DBClient>,
}

impl LifecycleService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn user_delete_check(&self, user_id: Uuid) -> Result<DeleteCheck, ServiceError> {
        let count = self.db_client.count_active_complaints_for_user(user_id).await?;
        Ok(DeleteCheck::from_count(count))
    }

    pub async fn service_delete_check(&self, service_id: Uuid) -> Result<DeleteCheck, ServiceError> {
        let count = self
            .db_client
            .count_active_complaints_for_service(service_id)
            .await?;
        Ok(DeleteCheck::from_count(count))
    }

    pub async fn delete_user(
        &self,
        actor: &User,
        target_id: Uuid,
        force: bool,
        reason: Option<String>,
    ) -> Result<UserDeletion, ServiceError> {
        let target = self
            .db_client
            .get_user(Some(target_id), None)
            .await?
            .ok_or(ServiceError::UserNotFound(target_id))?;

        may_delete_user(actor, &target, force)?;

        let mode = user_delete_mode(force);
        if mode == DeleteMode::Force {
            let report = self.db_client.force_delete_user(target.id).await?;
            tracing::info!(
                "User {} force deleted by {}: {} complaint(s) closed, {} service(s) removed, {} rating(s) recomputed",
                target.id,
                actor.id,
                report.complaints_closed,
                report.services_removed,
                report.ratings_recomputed
            );
            return Ok(UserDeletion::Removed {
                user_id: target.id,
                report,
            });
        }

        let check = self.user_delete_check(target.id).await?;
        if let Err(err) = complaint_gate(mode, check) {
            tracing::info!(
                "Delete of user {} blocked: {} active complaint(s)",
                target.id,
                check.active_complaints
            );
            return Err(err);
        }

        self.db_client
            .deactivate_user(target.id, actor.id, reason)
            .await?;
        tracing::info!("User {} deactivated by {}", target.id, actor.id);

        Ok(UserDeletion::Deactivated { user_id: target.id })
    }

    /// Admin suspension: same cascade as a self-deletion, minus the complaint gate.
    pub async fn suspend_user(
        &self,
        actor: &User,
        target_id: Uuid,
        reason: Option<String>,
    ) -> Result<User, ServiceError> {
        let user = self
            .db_client
            .deactivate_user(target_id, actor.id, reason)
            .await?;
        tracing::info!(
            "User {} suspended by {} with sessions, company and services",
            user.id,
            actor.id
        );
        Ok(user)
    }

    pub async fn delete_company(&self, owner: &User) -> Result<(Company, u64), ServiceError> {
        let company = self
            .db_client
            .get_company_by_owner(owner.id)
            .await?
            .ok_or(ServiceError::CompanyNotFound)?;

        let (company, services) = self.db_client.deactivate_company(company.id).await?;
        tracing::info!(
            "Company {} deactivated by {} with {} service(s)",
            company.id,
            owner.id,
            services
        );

        Ok((company, services))
    }

    pub async fn delete_service(
        &self,
        actor: &User,
        service_id: Uuid,
        mode: DeleteMode,
    ) -> Result<ServiceDeletion, ServiceError> {
        let service = self
            .db_client
            .get_service(service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(service_id))?;
        let company = self
            .db_client
            .get_company(service.company_id)
            .await?
            .ok_or(ServiceError::CompanyNotFound)?;

        may_delete_service(actor, company.owner_id, mode)?;

        if mode != DeleteMode::Force {
            let check = self.service_delete_check(service.id).await?;
            if let Err(err) = complaint_gate(mode, check) {
                tracing::info!(
                    "{:?} delete of service {} blocked: {} active complaint(s)",
                    mode,
                    service.id,
                    check.active_complaints
                );
                return Err(err);
            }
        }

        let report = match mode {
            DeleteMode::Soft => {
                self.db_client.set_service_active(service.id, false).await?;
                ServiceRemovalReport::default()
            }
            DeleteMode::Hard => {
                if !self.db_client.hard_delete_service(service.id).await? {
                    return Err(ServiceError::ServiceNotFound(service.id));
                }
                ServiceRemovalReport::default()
            }
            DeleteMode::Force => self.db_client.force_delete_service(service.id).await?,
        };

        tracing::info!(
            "Service {} deleted ({:?}) by {}: {} complaint(s) closed, {} purged",
            service.id,
            mode,
            actor.id,
            report.complaints_closed,
            report.complaints_purged
        );

        Ok(ServiceDeletion {
            service_id: service.id,
            mode,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password: "hash".into(),
            role,
            phone: None,
            avatar_url: None,
            is_active: true,
            deactivated_at: None,
            deactivated_by: None,
            deactivation_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn users_may_delete_themselves_but_not_others() {
        let me = user(UserRole::User);
        let other = user(UserRole::User);
        assert!(may_delete_user(&me, &me, false).is_ok());
        assert!(may_delete_user(&me, &other, false).is_err());
        assert!(may_delete_user(&me, &me, true).is_err());
    }

    #[test]
    fn staff_accounts_need_a_superuser() {
        let admin = user(UserRole::Admin);
        let other_admin = user(UserRole::Admin);
        let superuser = user(UserRole::Superuser);
        let provider = user(UserRole::Provider);

        assert!(may_delete_user(&admin, &provider, true).is_ok());
        assert!(may_delete_user(&admin, &other_admin, false).is_err());
        assert!(may_delete_user(&superuser, &other_admin, true).is_ok());
        assert!(may_delete_user(&superuser, &superuser, true).is_err());
    }

    #[test]
    fn force_service_delete_is_staff_only() {
        let owner = user(UserRole::Provider);
        let admin = user(UserRole::Admin);

        assert!(may_delete_service(&owner, owner.id, DeleteMode::Soft).is_ok());
        assert!(may_delete_service(&owner, owner.id, DeleteMode::Hard).is_ok());
        assert!(may_delete_service(&owner, owner.id, DeleteMode::Force).is_err());
        assert!(may_delete_service(&owner, Uuid::new_v4(), DeleteMode::Soft).is_err());
        assert!(may_delete_service(&admin, owner.id, DeleteMode::Force).is_ok());
    }

    #[test]
    fn open_complaints_block_soft_and_hard_removal() {
        let busy = DeleteCheck::from_count(2);
        let idle = DeleteCheck::from_count(0);

        assert!(matches!(
            complaint_gate(DeleteMode::Soft, busy),
            Err(ServiceError::ActiveComplaints(2))
        ));
        assert!(matches!(
            complaint_gate(DeleteMode::Hard, busy),
            Err(ServiceError::ActiveComplaints(2))
        ));
        assert!(complaint_gate(DeleteMode::Force, busy).is_ok());
        assert!(complaint_gate(DeleteMode::Soft, idle).is_ok());
        assert!(complaint_gate(DeleteMode::Hard, idle).is_ok());
    }

    #[test]
    fn account_removal_is_soft_unless_forced() {
        assert_eq!(user_delete_mode(false), DeleteMode::Soft);
        assert_eq!(user_delete_mode(true), DeleteMode::Force);

        let busy = DeleteCheck::from_count(1);
        assert!(complaint_gate(user_delete_mode(false), busy).is_err());
        assert!(complaint_gate(user_delete_mode(true), busy).is_ok());
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn open_complaints_hold_back_removal_until_forced(pool: sqlx::PgPool) {
        use crate::test_support::{file_complaint, seed_marketplace};

        let db = Arc::new(DBClient::new(pool));
        let market = seed_marketplace(&db).await;
        file_complaint(&db, &market).await;
        let lifecycle = LifecycleService::new(db.clone());

        let blocked = lifecycle
            .delete_service(&market.owner, market.service.id, DeleteMode::Hard)
            .await;
        assert!(matches!(blocked, Err(ServiceError::ActiveComplaints(1))));

        let blocked = lifecycle
            .delete_user(&market.customer, market.customer.id, false, None)
            .await;
        assert!(matches!(blocked, Err(ServiceError::ActiveComplaints(1))));

        let mut admin = market.customer.clone();
        admin.id = db
            .save_user("Ada Admin", "ada@example.com", "hash", UserRole::Admin)
            .await
            .unwrap()
            .id;
        admin.role = UserRole::Admin;

        let removed = lifecycle
            .delete_service(&admin, market.service.id, DeleteMode::Force)
            .await
            .unwrap();
        assert_eq!(removed.report.complaints_closed, 1);
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres database at DATABASE_URL"]
    async fn suspension_blocks_new_bookings(pool: sqlx::PgPool) {
        use crate::{
            dtos::bookingdtos::CreateBookingDto,
            realtime::RealtimeHub,
            service::booking_service::BookingService,
            test_support::seed_marketplace,
        };

        let db = Arc::new(DBClient::new(pool));
        let market = seed_marketplace(&db).await;
        let lifecycle = LifecycleService::new(db.clone());
        let bookings = BookingService::new(db.clone(), Arc::new(RealtimeHub::new()));

        lifecycle
            .suspend_user(&market.customer, market.owner.id, Some("Chargebacks".to_string()))
            .await
            .unwrap();

        let attempt = bookings
            .create(
                &market.customer,
                CreateBookingDto {
                    service_id: market.service.id,
                    date: Utc::now() + chrono::Duration::days(3),
                    notes: None,
                },
            )
            .await;
        assert!(matches!(attempt, Err(ServiceError::Validation(_))));
    }
}
