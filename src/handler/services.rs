use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        bookingdb::BookingExt,
        companydb::CompanyExt,
        servicedb::{ServiceExt, Visibility},
    },
    dtos::servicedtos::{
        CreateServiceDto, DeleteServiceQuery, RateServiceDto, ServiceDetailDto, ServiceQueryDto,
        UpdateServiceDto,
    },
    error::HttpError,
    middleware::{auth, role_check, JWTAuthMiddleware},
    models::{
        companymodel::Company,
        servicemodel::{Service, ServiceListing},
        usermodel::{User, UserRole},
    },
    utils::sanitize::{clean_optional, clean_required},
    AppState,
};

pub fn services_handler() -> Router {
    let protected = Router::new()
        .route(
            "/",
            post(create_service).layer(middleware::from_fn(|state, req, next| {
                role_check(
                    state,
                    req,
                    next,
                    vec![UserRole::Provider, UserRole::Admin, UserRole::Superuser],
                )
            })),
        )
        .route(
            "/mine",
            get(get_my_services).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Provider])
            })),
        )
        .route("/:id", axum::routing::put(update_service).delete(delete_service))
        .route("/:id/can-delete", get(can_delete_service))
        .route("/:id/ratings", post(rate_service).delete(remove_rating))
        .layer(middleware::from_fn(auth));

    Router::new()
        .route("/", get(get_services))
        .route("/:id", get(get_service))
        .merge(protected)
}

/// Staff manage any service; providers only their own company's.
fn may_manage(user: &User, company: &Company) -> bool {
    user.role.is_staff() || company.owner_id == user.id
}

async fn service_with_company(
    app_state: &AppState,
    service_id: Uuid,
) -> Result<(Service, Company), HttpError> {
    let service = app_state
        .db_client
        .get_service(service_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Service not found"))?;
    let company = app_state
        .db_client
        .get_company(service.company_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Company not found"))?;
    Ok((service, company))
}

pub async fn get_services(
    Query(query_params): Query<ServiceQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let (services, total) = app_state
        .db_client
        .get_services(&query_params, Visibility::Public)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": services,
        "results": total,
    })))
}

pub async fn get_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let service = app_state
        .db_client
        .get_service_listing(service_id)
        .await?
        .filter(ServiceListing::is_public)
        .ok_or_else(|| HttpError::not_found("Service not found"))?;

    let ratings = app_state.db_client.get_service_ratings(service_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ServiceDetailDto { service, ratings },
    })))
}

pub async fn get_my_services(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let company = app_state
        .db_client
        .get_company_by_owner(user.user.id)
        .await?
        .ok_or_else(|| HttpError::not_found("You have not registered a company yet"))?;

    let services = app_state
        .db_client
        .get_company_services(company.id, false)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": services.len(),
        "data": services,
    })))
}

pub async fn create_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateServiceDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let company = if user.user.role.is_staff() {
        let company_id = body
            .company_id
            .ok_or_else(|| HttpError::bad_request("company_id is required"))?;
        app_state
            .db_client
            .get_company(company_id)
            .await?
            .ok_or_else(|| HttpError::not_found("Company not found"))?
    } else {
        let company = app_state
            .db_client
            .get_company_by_owner(user.user.id)
            .await?
            .ok_or_else(|| HttpError::bad_request("Register a company before adding services"))?;
        if body.company_id.is_some_and(|id| id != company.id) {
            return Err(HttpError::forbidden("You can only add services to your own company"));
        }
        company
    };

    if !company.is_active {
        return Err(HttpError::bad_request("This company has been deactivated"));
    }

    let (Some(name), Some(description)) = (clean_required(&body.name), clean_required(&body.description))
    else {
        return Err(HttpError::bad_request("Name and description are required"));
    };
    let body = CreateServiceDto {
        name,
        description,
        ..body
    };

    let service = app_state
        .db_client
        .create_service(company.id, user.user.id, &body)
        .await?;
    tracing::info!("Service {} created for company {} by {}", service.id, company.id, user.user.id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": service,
        })),
    ))
}

pub async fn update_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(service_id): Path<Uuid>,
    Json(body): Json<UpdateServiceDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let (service, company) = service_with_company(&app_state, service_id).await?;
    if !may_manage(&user.user, &company) {
        return Err(HttpError::forbidden("You can only edit your own services"));
    }

    let body = UpdateServiceDto {
        name: clean_optional(body.name),
        description: clean_optional(body.description),
        ..body
    };

    let service = app_state.db_client.update_service(service.id, &body).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": service,
    })))
}

pub async fn can_delete_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let (service, company) = service_with_company(&app_state, service_id).await?;
    if !may_manage(&user.user, &company) {
        return Err(HttpError::forbidden("You can only manage your own services"));
    }

    let check = app_state
        .lifecycle_service
        .service_delete_check(service.id)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": check,
    })))
}

pub async fn delete_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(service_id): Path<Uuid>,
    Query(query): Query<DeleteServiceQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .lifecycle_service
        .delete_service(&user.user, service_id, query.mode.unwrap_or_default())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": outcome,
    })))
}

pub async fn rate_service(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(service_id): Path<Uuid>,
    Json(body): Json<RateServiceDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let (service, company) = service_with_company(&app_state, service_id).await?;
    if company.owner_id == user.user.id {
        return Err(HttpError::forbidden("You cannot rate your own service"));
    }
    if !service.is_active {
        return Err(HttpError::bad_request("This service is no longer available"));
    }

    let eligible = app_state
        .db_client
        .has_completed_booking(user.user.id, service.id)
        .await?;
    if !eligible {
        return Err(HttpError::forbidden(
            "You can only rate services from your completed bookings",
        ));
    }

    let (rating, service) = app_state
        .db_client
        .upsert_rating(service.id, user.user.id, body.value, clean_optional(body.review))
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "rating": rating,
            "rating_average": service.rating_average,
            "rating_count": service.rating_count,
        },
    })))
}

pub async fn remove_rating(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Path(service_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let service = app_state
        .db_client
        .delete_rating(service_id, user.user.id)
        .await?
        .ok_or_else(|| HttpError::not_found("You have not rated this service"))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "rating_average": service.rating_average,
            "rating_count": service.rating_count,
        },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::test_support::test_user;

    fn company(owner_id: Uuid) -> Company {
        Company {
            id: Uuid::new_v4(),
            owner_id,
            name: "Acme Cleaning".into(),
            description: None,
            email: None,
            phone: None,
            address: None,
            logo_url: None,
            is_verified: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owners_and_staff_manage_services() {
        let owner = test_user(UserRole::Provider);
        let other = test_user(UserRole::Provider);
        let admin = test_user(UserRole::Admin);
        let company = company(owner.id);

        assert!(may_manage(&owner, &company));
        assert!(may_manage(&admin, &company));
        assert!(!may_manage(&other, &company));
    }
}
