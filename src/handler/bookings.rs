use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{bookingdb::BookingExt, companydb::CompanyExt},
    dtos::{
        bookingdtos::{BookingQueryDto, CreateBookingDto, UpdateBookingStatusDto},
        page_number,
    },
    error::HttpError,
    middleware::{role_check, JWTAuthMiddleware},
    models::usermodel::UserRole,
    AppState,
};

pub fn bookings_handler() -> Router {
    Router::new()
        .route("/", get(get_my_bookings).post(create_booking))
        .route(
            "/provider",
            get(get_provider_bookings).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Provider])
            })),
        )
        .route("/:id", get(get_booking))
        .route("/:id/status", patch(update_booking_status))
}

pub async fn create_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateBookingDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let booking = app_state.booking_service.create(&user.user, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": booking,
        })),
    ))
}

pub async fn get_my_bookings(
    Query(query_params): Query<BookingQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let (bookings, total) = app_state
        .db_client
        .get_user_bookings(user.user.id, query_params.status, page_number(page), limit)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": bookings,
        "results": total,
    })))
}

pub async fn get_provider_bookings(
    Query(query_params): Query<BookingQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let company = app_state
        .db_client
        .get_company_by_owner(user.user.id)
        .await?
        .ok_or_else(|| HttpError::not_found("You have not registered a company yet"))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let (bookings, total) = app_state
        .db_client
        .get_company_bookings(company.id, query_params.status, page_number(page), limit)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": bookings,
        "results": total,
    })))
}

pub async fn get_booking(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .db_client
        .get_booking_details(booking_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Booking not found"))?;

    let is_owner = match booking.company_id {
        Some(company_id) => app_state
            .db_client
            .get_company(company_id)
            .await?
            .is_some_and(|company| company.owner_id == user.user.id),
        None => false,
    };

    if booking.user_id != user.user.id && !is_owner && !user.user.role.is_staff() {
        return Err(HttpError::forbidden("You are not allowed to view this booking"));
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": booking,
    })))
}

pub async fn update_booking_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<UpdateBookingStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let booking = app_state
        .booking_service
        .update_status(&user.user, booking_id, body.status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": booking,
    })))
}
