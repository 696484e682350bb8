// service/complaint_service.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{
        bookingdb::BookingExt,
        companydb::CompanyExt,
        complaintdb::{ComplaintExt, NewComplaint},
        servicedb::ServiceExt,
        DBClient,
    },
    dtos::complaintdtos::{ComplaintDetailDto, CreateComplaintDto, StaffComplaintUpdateDto},
    models::{
        bookingmodel::BookingStatus,
        complaintmodel::{Complaint, ComplaintActor, ComplaintStatus, ServiceSnapshot},
        usermodel::User,
    },
    realtime::{events, RealtimeHub},
    service::error::ServiceError,
    utils::sanitize::{clean_optional, clean_text},
};

/// Complaints can only be filed once the provider has taken the job.
pub fn booking_accepts_complaints(status: BookingStatus) -> bool {
    matches!(status, BookingStatus::Accepted | BookingStatus::Completed)
}

#[derive(Debug, Clone)]
pub struct ComplaintService {
    db_client: Arc<DBClient>,
    realtime: Arc<RealtimeHub>,
}

impl ComplaintService {
    pub fn new(db_client: Arc<DBClient>, realtime: Arc<RealtimeHub>) -> Self {
        Self { db_client, realtime }
    }

    pub async fn create(
        &self,
        user: &User,
        body: CreateComplaintDto,
    ) -> Result<ComplaintDetailDto, ServiceError> {
        let booking = self
            .db_client
            .get_booking(body.booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(body.booking_id))?;

        if booking.user_id != user.id {
            return Err(ServiceError::Forbidden(
                "You can only complain about your own bookings".to_string(),
            ));
        }

        if !booking_accepts_complaints(booking.status) {
            return Err(ServiceError::Validation(
                "Complaints can only be filed for accepted or completed bookings".to_string(),
            ));
        }

        let service_id = booking.service_id.ok_or_else(|| {
            ServiceError::Validation("The booked service no longer exists".to_string())
        })?;
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

        if self.db_client.has_pending_complaint(booking.id).await? {
            return Err(ServiceError::Conflict(
                "A pending complaint already exists for this booking".to_string(),
            ));
        }

        let snapshot = ServiceSnapshot {
            service_name: service.name.clone(),
            service_category: service.category.clone(),
            service_price: service.price.clone(),
            company_name: company.name.clone(),
        };
        let subject = clean_text(&body.subject);
        let description = clean_text(&body.description);
        if subject.is_empty() || description.is_empty() {
            return Err(ServiceError::Validation("Subject and description are required".to_string()));
        }

        let (complaint, images) = self
            .db_client
            .create_complaint(NewComplaint {
                user_id: user.id,
                service_id: service.id,
                booking_id: booking.id,
                subject: &subject,
                description: &description,
                snapshot: &snapshot,
                images: &body.images,
            })
            .await?;

        tracing::info!(
            "Complaint {} filed by {} against service {} (booking {})",
            complaint.id,
            user.id,
            service.id,
            booking.id
        );

        let detail = ComplaintDetailDto { complaint, images };
        self.realtime.emit_to_staff(events::COMPLAINT_NEW, &detail).await;

        Ok(detail)
    }

    /// Owner or staff view with attached images.
    pub async fn get_for(&self, user: &User, complaint_id: Uuid) -> Result<ComplaintDetailDto, ServiceError> {
        let complaint = self.load(complaint_id).await?;

        if complaint.user_id != user.id && !user.role.is_staff() {
            return Err(ServiceError::Forbidden("You cannot view this complaint".to_string()));
        }

        let images = self.db_client.get_complaint_images(complaint.id).await?;
        Ok(ComplaintDetailDto { complaint, images })
    }

    pub async fn staff_update(
        &self,
        staff: &User,
        complaint_id: Uuid,
        body: StaffComplaintUpdateDto,
    ) -> Result<Complaint, ServiceError> {
        if !staff.role.is_staff() {
            return Err(ServiceError::Forbidden("Only staff can update complaints".to_string()));
        }

        let complaint = self.load(complaint_id).await?;
        let updated = self
            .transition(
                &complaint,
                body.status,
                ComplaintActor::Staff,
                clean_optional(body.admin_response),
            )
            .await?;

        tracing::info!(
            "Complaint {} moved {} -> {} by staff {}",
            updated.id,
            complaint.status.to_str(),
            updated.status.to_str(),
            staff.id
        );

        self.realtime
            .emit_to_user(updated.user_id, events::COMPLAINT_UPDATED, &updated)
            .await;

        Ok(updated)
    }

    /// `resolved == false` reopens the complaint for staff.
    pub async fn owner_confirm(
        &self,
        user: &User,
        complaint_id: Uuid,
        resolved: bool,
    ) -> Result<Complaint, ServiceError> {
        let complaint = self.load(complaint_id).await?;

        if complaint.user_id != user.id {
            return Err(ServiceError::Forbidden("Only the complainant can confirm a resolution".to_string()));
        }

        let to = if resolved {
            ComplaintStatus::Resolved
        } else {
            ComplaintStatus::InProgress
        };
        let updated = self
            .transition(&complaint, to, ComplaintActor::Owner, None)
            .await?;

        tracing::info!(
            "Complaint {} moved {} -> {} by owner {}",
            updated.id,
            complaint.status.to_str(),
            updated.status.to_str(),
            user.id
        );

        self.realtime
            .emit_to_staff(events::COMPLAINT_UPDATED, &updated)
            .await;

        Ok(updated)
    }

    pub async fn withdraw(&self, user: &User, complaint_id: Uuid) -> Result<(), ServiceError> {
        let complaint = self.load(complaint_id).await?;

        if complaint.user_id != user.id {
            return Err(ServiceError::Forbidden("You can only withdraw your own complaints".to_string()));
        }
        if complaint.status != ComplaintStatus::Pending {
            return Err(ServiceError::Validation(
                "Only pending complaints can be withdrawn".to_string(),
            ));
        }

        let deleted = self
            .db_client
            .delete_complaint(complaint.id, ComplaintStatus::Pending)
            .await?;
        if !deleted {
            return Err(ServiceError::Conflict(
                "Complaint is already being handled".to_string(),
            ));
        }

        tracing::info!("Complaint {} withdrawn by {}", complaint.id, user.id);
        Ok(())
    }

    /// Resolves complaints the owner left unanswered for `days`.
    pub async fn auto_resolve(&self, days: i64) -> Result<usize, ServiceError> {
        let before = Utc::now() - Duration::days(days);
        let resolved = self.db_client.auto_resolve_stale(before).await?;

        for complaint in &resolved {
            self.realtime
                .emit_to_user(complaint.user_id, events::COMPLAINT_UPDATED, complaint)
                .await;
        }

        Ok(resolved.len())
    }

    async fn load(&self, complaint_id: Uuid) -> Result<Complaint, ServiceError> {
        self.db_client
            .get_complaint(complaint_id)
            .await?
            .ok_or(ServiceError::ComplaintNotFound(complaint_id))
    }

    async fn transition(
        &self,
        complaint: &Complaint,
        to: ComplaintStatus,
        actor: ComplaintActor,
        admin_response: Option<String>,
    ) -> Result<Complaint, ServiceError> {
        if !complaint.status.can_transition(to, actor) {
            return Err(ServiceError::InvalidComplaintTransition(complaint.status, to));
        }

        self.db_client
            .update_complaint_status(complaint.id, complaint.status, to, admin_response)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict("Complaint was updated by someone else. Please refresh".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_taken_bookings_accept_complaints() {
        assert!(booking_accepts_complaints(BookingStatus::Accepted));
        assert!(booking_accepts_complaints(BookingStatus::Completed));
        assert!(!booking_accepts_complaints(BookingStatus::Pending));
        assert!(!booking_accepts_complaints(BookingStatus::Rejected));
        assert!(!booking_accepts_complaints(BookingStatus::Cancelled));
    }
}
