// service/booking_service.rs
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{bookingdb::BookingExt, companydb::CompanyExt, servicedb::ServiceExt, userdb::UserExt, DBClient},
    dtos::bookingdtos::CreateBookingDto,
    models::{
        bookingmodel::{Booking, BookingActor, BookingStatus},
        usermodel::User,
    },
    realtime::{events, RealtimeHub},
    service::error::ServiceError,
    utils::sanitize::clean_optional,
};

/// The company owner acts as Provider, the booking's user as Customer.
pub fn resolve_actor(booking: &Booking, company_owner: Option<Uuid>, user_id: Uuid) -> Option<BookingActor> {
    if company_owner == Some(user_id) {
        Some(BookingActor::Provider)
    } else if booking.user_id == user_id {
        Some(BookingActor::Customer)
    } else {
        None
    }
}

/// A booking needs a live service, a live company and an owner who can still log in.
pub fn ensure_bookable(
    service_active: bool,
    company_active: bool,
    owner_active: bool,
) -> Result<(), ServiceError> {
    if !service_active {
        return Err(ServiceError::Validation("This service is not available for booking".to_string()));
    }
    if !company_active || !owner_active {
        return Err(ServiceError::Validation("This company is not accepting bookings".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BookingService {
    db_client: Arc<DBClient>,
    realtime: Arc<RealtimeHub>,
}

impl BookingService {
    pub fn new(db_client: Arc<DBClient>, realtime: Arc<RealtimeHub>) -> Self {
        Self { db_client, realtime }
    }

    pub async fn create(&self, user: &User, body: CreateBookingDto) -> Result<Booking, ServiceError> {
        let service = self
            .db_client
            .get_service(body.service_id)
            .await?
            .ok_or(ServiceError::ServiceNotFound(body.service_id))?;

        let company = self
            .db_client
            .get_company(service.company_id)
            .await?
            .ok_or(ServiceError::CompanyNotFound)?;
        let owner_active = self
            .db_client
            .get_user(Some(company.owner_id), None)
            .await?
            .is_some_and(|owner| owner.is_active);

        ensure_bookable(service.is_active, company.is_active, owner_active)?;

        if company.owner_id == user.id {
            return Err(ServiceError::Forbidden("You cannot book your own service".to_string()));
        }

        if body.date <= Utc::now() {
            return Err(ServiceError::Validation("Booking date must be in the future".to_string()));
        }

        let booking = self
            .db_client
            .create_booking(user.id, company.id, service.id, body.date, clean_optional(body.notes))
            .await?;

        tracing::info!(
            "Booking {} created by {} for service {} ({})",
            booking.id,
            user.id,
            service.id,
            company.name
        );

        match self.db_client.get_booking_details(booking.id).await? {
            Some(details) => {
                self.realtime
                    .emit_to_user(company.owner_id, events::BOOKING_NEW, &details)
                    .await
            }
            None => {
                self.realtime
                    .emit_to_user(company.owner_id, events::BOOKING_NEW, &booking)
                    .await
            }
        };

        Ok(booking)
    }

    pub async fn update_status(
        &self,
        user: &User,
        booking_id: Uuid,
        to: BookingStatus,
    ) -> Result<Booking, ServiceError> {
        let booking = self
            .db_client
            .get_booking(booking_id)
            .await?
            .ok_or(ServiceError::BookingNotFound(booking_id))?;

        let company_owner = match booking.company_id {
            Some(company_id) => self
                .db_client
                .get_company(company_id)
                .await?
                .map(|company| company.owner_id),
            None => None,
        };

        let actor = resolve_actor(&booking, company_owner, user.id).ok_or_else(|| {
            ServiceError::Forbidden("You are not allowed to update this booking".to_string())
        })?;

        if !booking.status.can_transition(to, actor) {
            return Err(ServiceError::InvalidBookingTransition(booking.status, to));
        }

        let updated = self
            .db_client
            .update_booking_status(booking.id, booking.status, to)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict("Booking was updated by someone else. Please refresh".to_string())
            })?;

        tracing::info!(
            "Booking {} moved {} -> {} by {:?} {}",
            updated.id,
            booking.status.to_str(),
            updated.status.to_str(),
            actor,
            user.id
        );

        self.realtime
            .emit_to_user(updated.user_id, events::BOOKING_UPDATED, &updated)
            .await;
        if let Some(owner_id) = company_owner.filter(|owner| *owner != updated.user_id) {
            self.realtime
                .emit_to_user(owner_id, events::BOOKING_UPDATED, &updated)
                .await;
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn booking(user_id: Uuid) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id,
            company_id: Some(Uuid::new_v4()),
            service_id: Some(Uuid::new_v4()),
            date: Utc::now() + Duration::days(2),
            notes: None,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn actor_is_derived_from_ownership() {
        let customer = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let b = booking(customer);

        assert_eq!(resolve_actor(&b, Some(owner), owner), Some(BookingActor::Provider));
        assert_eq!(resolve_actor(&b, Some(owner), customer), Some(BookingActor::Customer));
        assert_eq!(resolve_actor(&b, Some(owner), Uuid::new_v4()), None);
        assert_eq!(resolve_actor(&b, None, customer), Some(BookingActor::Customer));
    }

    #[test]
    fn suspended_owner_blocks_new_bookings() {
        assert!(ensure_bookable(true, true, true).is_ok());
        assert!(matches!(
            ensure_bookable(true, true, false),
            Err(ServiceError::Validation(_))
        ));
        assert!(ensure_bookable(true, false, true).is_err());
        assert!(ensure_bookable(false, true, true).is_err());
    }
}
