use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{companydb::CompanyExt, servicedb::ServiceExt},
    dtos::companydtos::{CompanyWithServices, CreateCompanyDto, UpdateCompanyDto},
    error::HttpError,
    middleware::{auth, role_check, JWTAuthMiddleware},
    models::{companymodel::Company, usermodel::UserRole},
    utils::sanitize::{clean_optional, clean_required},
    AppState,
};

pub fn companies_handler() -> Router {
    let protected = Router::new()
        .route(
            "/",
            post(create_company).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Provider])
            })),
        )
        .route(
            "/mine",
            get(get_my_company)
                .put(update_my_company)
                .delete(delete_my_company),
        )
        .layer(middleware::from_fn(auth));

    Router::new()
        .route("/:id", get(get_company))
        .merge(protected)
}

async fn owned_company(app_state: &AppState, owner_id: Uuid) -> Result<Company, HttpError> {
    app_state
        .db_client
        .get_company_by_owner(owner_id)
        .await?
        .ok_or_else(|| HttpError::not_found("You have not registered a company yet"))
}

pub async fn get_company(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let company = app_state
        .db_client
        .get_company(company_id)
        .await?
        .filter(|company| company.is_active)
        .ok_or_else(|| HttpError::not_found("Company not found"))?;

    let services = app_state
        .db_client
        .get_company_services(company.id, true)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": CompanyWithServices { company, services },
    })))
}

pub async fn create_company(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateCompanyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    if app_state
        .db_client
        .get_company_by_owner(user.user.id)
        .await?
        .is_some()
    {
        return Err(HttpError::conflict("You already own a company"));
    }

    let name = clean_required(&body.name)
        .ok_or_else(|| HttpError::bad_request("Company name is required"))?;
    let body = CreateCompanyDto {
        name,
        description: clean_optional(body.description),
        address: clean_optional(body.address),
        ..body
    };

    let company = app_state
        .db_client
        .create_company(user.user.id, &body)
        .await?;
    tracing::info!("Company {} registered by {}", company.id, user.user.id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": company,
        })),
    ))
}

pub async fn get_my_company(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let company = owned_company(&app_state, user.user.id).await?;
    let services = app_state
        .db_client
        .get_company_services(company.id, false)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": CompanyWithServices { company, services },
    })))
}

pub async fn update_my_company(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateCompanyDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let company = owned_company(&app_state, user.user.id).await?;
    if !company.is_active {
        return Err(HttpError::forbidden("This company has been deactivated"));
    }

    let body = UpdateCompanyDto {
        name: clean_optional(body.name),
        description: clean_optional(body.description),
        address: clean_optional(body.address),
        ..body
    };

    let company = app_state.db_client.update_company(company.id, &body).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": company,
    })))
}

pub async fn delete_my_company(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let (company, services_deactivated) = app_state
        .lifecycle_service
        .delete_company(&user.user)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "company": company,
            "services_deactivated": services_deactivated,
        },
    })))
}
