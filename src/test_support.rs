use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::{postgres::PgPoolOptions, types::BigDecimal};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{
        bookingdb::BookingExt,
        companydb::CompanyExt,
        complaintdb::{ComplaintExt, NewComplaint},
        servicedb::ServiceExt,
        userdb::UserExt,
        DBClient,
    },
    dtos::{companydtos::CreateCompanyDto, servicedtos::CreateServiceDto},
    models::{
        bookingmodel::{Booking, BookingStatus},
        companymodel::Company,
        complaintmodel::{Complaint, ServiceSnapshot},
        servicemodel::Service,
        usermodel::{User, UserRole},
    },
    AppState,
};

/// State backed by a lazy pool; nothing connects until a query runs.
pub fn test_state() -> Arc<AppState> {
    let config = Config::for_tests();
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_lazy(&config.database_url)
        .expect("lazy pool from a valid url");

    Arc::new(AppState::new(config, DBClient::new(pool)))
}

pub fn test_user(role: UserRole) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        name: "Test User".to_string(),
        email: format!("{}@example.com", id.simple()),
        password: String::new(),
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

/// A provider with one company and service, plus a customer holding a
/// completed booking against it. Rows live in a `#[sqlx::test]` database.
pub struct Marketplace {
    pub owner: User,
    pub customer: User,
    pub company: Company,
    pub service: Service,
    pub booking: Booking,
}

pub async fn seed_marketplace(db: &DBClient) -> Marketplace {
    let owner = db
        .save_user("Olu Provider", "olu@example.com", "hash", UserRole::Provider)
        .await
        .expect("owner");
    let customer = db
        .save_user("Cara Customer", "cara@example.com", "hash", UserRole::User)
        .await
        .expect("customer");

    let company = db
        .create_company(
            owner.id,
            &CreateCompanyDto {
                name: "Spotless".to_string(),
                description: None,
                email: None,
                phone: None,
                address: None,
                logo_url: None,
            },
        )
        .await
        .expect("company");

    let service = db
        .create_service(
            company.id,
            owner.id,
            &CreateServiceDto {
                name: "Deep clean".to_string(),
                description: "Whole flat, top to bottom".to_string(),
                category: "cleaning".to_string(),
                price: BigDecimal::from(120),
                duration_minutes: Some(180),
                image_url: None,
                company_id: None,
            },
        )
        .await
        .expect("service");

    let booking = db
        .create_booking(customer.id, company.id, service.id, Utc::now() + Duration::days(1), None)
        .await
        .expect("booking");
    let booking = db
        .update_booking_status(booking.id, BookingStatus::Pending, BookingStatus::Completed)
        .await
        .expect("status update")
        .expect("booking still pending");

    Marketplace {
        owner,
        customer,
        company,
        service,
        booking,
    }
}

pub async fn file_complaint(db: &DBClient, market: &Marketplace) -> Complaint {
    let snapshot = ServiceSnapshot {
        service_name: market.service.name.clone(),
        service_category: market.service.category.clone(),
        service_price: market.service.price.clone(),
        company_name: market.company.name.clone(),
    };
    let (complaint, _) = db
        .create_complaint(NewComplaint {
            user_id: market.customer.id,
            service_id: market.service.id,
            booking_id: market.booking.id,
            subject: "Missed a room",
            description: "The kitchen was never cleaned",
            snapshot: &snapshot,
            images: &[],
        })
        .await
        .expect("complaint");
    complaint
}
