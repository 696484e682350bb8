use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{delete, get, patch},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        admindb::AdminExt,
        companydb::CompanyExt,
        complaintdb::ComplaintExt,
        lifecycledb::LifecycleExt,
        servicedb::{ServiceExt, Visibility},
        userdb::{UserExt, UserFilter},
    },
    dtos::{
        companydtos::{ActiveFlagDto, AdminCompanyQueryDto, CompanyVerifyDto},
        complaintdtos::{ComplaintQueryDto, StaffComplaintUpdateDto},
        page_number,
        servicedtos::ServiceQueryDto,
        userdtos::{
            AdminUserQueryDto, DeleteUserQuery, FilterUserDto, RoleUpdateDto, UserListResponseDto,
            UserResponseDto, UserStatusUpdateDto,
        },
    },
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddleware,
    models::usermodel::{User, UserRole},
    utils::sanitize::clean_optional,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/users", get(get_users))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/status", patch(update_user_status))
        .route("/users/:id/role", patch(update_user_role))
        .route("/companies", get(get_companies))
        .route("/companies/:id/verify", patch(verify_company))
        .route("/companies/:id/status", patch(update_company_status))
        .route("/services", get(get_services))
        .route("/services/:id/status", patch(update_service_status))
        .route("/complaints", get(get_complaints))
        .route("/complaints/:id/status", patch(update_complaint_status))
        .route("/online-users", get(get_online_users))
}

/// Staff accounts and staff roles are only handed out or touched by a
/// superuser. Nobody changes their own role.
pub fn role_change_allowed(actor: &User, target: &User, role: UserRole) -> Result<(), HttpError> {
    if actor.id == target.id {
        return Err(HttpError::forbidden("You cannot change your own role"));
    }
    if (target.role.is_staff() || role.is_staff()) && actor.role != UserRole::Superuser {
        return Err(HttpError::forbidden("Only a superuser can grant or revoke staff roles"));
    }
    Ok(())
}

/// Suspending an account follows the same rank rule as changing roles.
pub fn status_change_allowed(actor: &User, target: &User) -> Result<(), HttpError> {
    if actor.id == target.id {
        return Err(HttpError::forbidden("You cannot change your own account status"));
    }
    if target.role.is_staff() && actor.role != UserRole::Superuser {
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }
    Ok(())
}

async fn load_user(app_state: &AppState, user_id: Uuid) -> Result<User, HttpError> {
    app_state
        .db_client
        .get_user(Some(user_id), None)
        .await?
        .ok_or_else(|| HttpError::not_found("User not found"))
}

pub async fn get_stats(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = app_state.db_client.get_platform_stats().await?;
    let online = app_state.realtime.online_users().await.len();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "stats": stats,
            "online_users": online,
        },
    })))
}

pub async fn get_users(
    Query(query_params): Query<AdminUserQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let filter = UserFilter {
        role: query_params.role,
        is_active: query_params.active,
        search: query_params.q,
    };

    let users = app_state
        .db_client
        .get_users(&filter, page_number(page), limit)
        .await?;
    let user_count = app_state.db_client.get_user_count(&filter).await?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    }))
}

pub async fn update_user_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UserStatusUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let target = load_user(&app_state, user_id).await?;
    status_change_allowed(&admin.user, &target)?;

    let updated = if body.is_active {
        app_state
            .db_client
            .set_user_active(target.id, true, None, None)
            .await?
    } else {
        let updated = app_state
            .lifecycle_service
            .suspend_user(&admin.user, target.id, clean_optional(body.reason))
            .await?;
        app_state
            .realtime
            .close_user(target.id, &ErrorMessage::AccountDeactivated.to_string())
            .await;
        updated
    };

    Ok(Json(UserResponseDto::from_user(&updated)))
}

pub async fn update_user_role(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let target = load_user(&app_state, user_id).await?;
    role_change_allowed(&admin.user, &target, body.role)?;

    let updated = app_state
        .db_client
        .update_user_role(target.id, body.role)
        .await?;
    tracing::info!(
        "User {} role {} -> {} by {}",
        target.id,
        target.role.to_str(),
        updated.role.to_str(),
        admin.user.id
    );

    Ok(Json(UserResponseDto::from_user(&updated)))
}

pub async fn delete_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddleware>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<DeleteUserQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .lifecycle_service
        .delete_user(
            &admin.user,
            user_id,
            query.force.unwrap_or(false),
            clean_optional(query.reason),
        )
        .await?;
    app_state
        .realtime
        .close_user(user_id, &ErrorMessage::AccountDeactivated.to_string())
        .await;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": outcome,
    })))
}

pub async fn get_companies(
    Query(query_params): Query<AdminCompanyQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let companies = app_state
        .db_client
        .get_companies(query_params.verified, page_number(page), limit)
        .await?;
    let total = app_state
        .db_client
        .get_company_count(query_params.verified)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": companies,
        "results": total,
    })))
}

pub async fn verify_company(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddleware>,
    Path(company_id): Path<Uuid>,
    Json(body): Json<CompanyVerifyDto>,
) -> Result<impl IntoResponse, HttpError> {
    let company = app_state
        .db_client
        .set_company_verified(company_id, body.is_verified)
        .await?;
    tracing::info!(
        "Company {} verified={} by {}",
        company.id,
        company.is_verified,
        admin.user.id
    );

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": company,
    })))
}

pub async fn update_company_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddleware>,
    Path(company_id): Path<Uuid>,
    Json(body): Json<ActiveFlagDto>,
) -> Result<impl IntoResponse, HttpError> {
    let (company, services_deactivated) = if body.is_active {
        (app_state.db_client.reactivate_company(company_id).await?, 0)
    } else {
        app_state.db_client.deactivate_company(company_id).await?
    };
    tracing::info!(
        "Company {} active={} by {}",
        company.id,
        company.is_active,
        admin.user.id
    );

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "company": company,
            "services_deactivated": services_deactivated,
        },
    })))
}

pub async fn get_services(
    Query(query_params): Query<ServiceQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let (services, total) = app_state
        .db_client
        .get_services(&query_params, Visibility::All)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": services,
        "results": total,
    })))
}

pub async fn update_service_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
    Json(body): Json<ActiveFlagDto>,
) -> Result<impl IntoResponse, HttpError> {
    let service = app_state
        .db_client
        .set_service_active(service_id, body.is_active)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": service,
    })))
}

pub async fn get_complaints(
    Query(query_params): Query<ComplaintQueryDto>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate()?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let (complaints, total) = app_state
        .db_client
        .get_complaints(query_params.status, page_number(page), limit)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": complaints,
        "results": total,
    })))
}

pub async fn update_complaint_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(admin): Extension<JWTAuthMiddleware>,
    Path(complaint_id): Path<Uuid>,
    Json(body): Json<StaffComplaintUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()?;

    let complaint = app_state
        .complaint_service
        .staff_update(&admin.user, complaint_id, body)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": complaint,
    })))
}

pub async fn get_online_users(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let online = app_state.realtime.online_users().await;

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": online.len(),
        "data": online,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_user;

    #[test]
    fn admins_move_customers_and_providers() {
        let admin = test_user(UserRole::Admin);
        let customer = test_user(UserRole::User);
        assert!(role_change_allowed(&admin, &customer, UserRole::Provider).is_ok());
    }

    #[test]
    fn only_superusers_touch_staff_roles() {
        let admin = test_user(UserRole::Admin);
        let superuser = test_user(UserRole::Superuser);
        let customer = test_user(UserRole::User);
        let other_admin = test_user(UserRole::Admin);

        assert!(role_change_allowed(&admin, &customer, UserRole::Admin).is_err());
        assert!(role_change_allowed(&admin, &other_admin, UserRole::User).is_err());
        assert!(role_change_allowed(&superuser, &customer, UserRole::Admin).is_ok());
        assert!(role_change_allowed(&superuser, &other_admin, UserRole::User).is_ok());
    }

    #[test]
    fn nobody_changes_their_own_role() {
        let superuser = test_user(UserRole::Superuser);
        assert!(role_change_allowed(&superuser, &superuser, UserRole::User).is_err());
    }

    #[test]
    fn suspending_staff_needs_a_superuser() {
        let admin = test_user(UserRole::Admin);
        let other_admin = test_user(UserRole::Admin);
        let superuser = test_user(UserRole::Superuser);
        let provider = test_user(UserRole::Provider);

        assert!(status_change_allowed(&admin, &provider).is_ok());
        assert!(status_change_allowed(&admin, &other_admin).is_err());
        assert!(status_change_allowed(&superuser, &other_admin).is_ok());
        assert!(status_change_allowed(&admin, &admin).is_err());
    }
}
